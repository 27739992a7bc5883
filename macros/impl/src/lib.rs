//! Procedural macros for testing kiln crates.
//!
//! Use them through `kiln-macros`, which also provides the crates the generated code refers to.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, AttributeArgs, ItemFn, Lit, Meta, NestedMeta};

/// Run a test with a `tracing` subscriber that writes to the test output.
///
/// The maximum level defaults to `DEBUG` and can be changed with `level = "..."` (one of
/// `TRACE`, `DEBUG`, `INFO`, `WARN`, `ERROR`). Other attributes on the function (e.g.
/// `#[should_panic]`) are kept.
///
/// # Example
///
/// ```ignore
/// use kiln_macros::test_traced;
///
/// #[test_traced(level = "INFO")]
/// fn test_something() {
///     tracing::info!("visible in the test output");
/// }
/// ```
#[proc_macro_attribute]
pub fn test_traced(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as AttributeArgs);
    let input = parse_macro_input!(item as ItemFn);

    let level = match parse_level(&args) {
        Ok(level) => level,
        Err(err) => return err.to_compile_error().into(),
    };

    let attrs = &input.attrs;
    let vis = &input.vis;
    let sig = &input.sig;
    let block = &input.block;

    let expanded = quote! {
        #[test]
        #(#attrs)*
        #vis #sig {
            let subscriber = ::kiln_macros::tracing_subscriber::fmt()
                .with_test_writer()
                .with_max_level(#level)
                .with_line_number(true)
                .finish();
            let dispatcher = ::kiln_macros::tracing::Dispatch::new(subscriber);
            ::kiln_macros::tracing::dispatcher::with_default(&dispatcher, || #block)
        }
    };
    TokenStream::from(expanded)
}

fn parse_level(args: &[NestedMeta]) -> Result<TokenStream2, syn::Error> {
    let mut level = String::from("DEBUG");
    for arg in args {
        match arg {
            NestedMeta::Meta(Meta::NameValue(nv)) if nv.path.is_ident("level") => match &nv.lit {
                Lit::Str(value) => level = value.value(),
                other => return Err(syn::Error::new_spanned(other, "level must be a string")),
            },
            other => {
                return Err(syn::Error::new_spanned(
                    other,
                    "unsupported argument, expected `level = \"...\"`",
                ))
            }
        }
    }

    let level = match level.to_ascii_uppercase().as_str() {
        "TRACE" => quote!(::kiln_macros::tracing::Level::TRACE),
        "DEBUG" => quote!(::kiln_macros::tracing::Level::DEBUG),
        "INFO" => quote!(::kiln_macros::tracing::Level::INFO),
        "WARN" => quote!(::kiln_macros::tracing::Level::WARN),
        "ERROR" => quote!(::kiln_macros::tracing::Level::ERROR),
        _ => {
            return Err(syn::Error::new(
                proc_macro2::Span::call_site(),
                "invalid level, expected one of TRACE, DEBUG, INFO, WARN, ERROR",
            ))
        }
    };
    Ok(level)
}
