use proc_macro::TokenStream;

use quote::quote;
use syn::{ItemStruct, parse, parse_macro_input};
use syn::parse::Parser;

/// Prepends `pub correlation_id: String` as the first field of a struct with named fields.
///
/// The field is `#[serde(default)]`, so a caller-supplied body may omit it and have it
/// assigned later from the routing key.
#[proc_macro_attribute]
pub fn add_correlation_id(args: TokenStream, input: TokenStream) -> TokenStream {
    let mut item_struct = parse_macro_input!(input as ItemStruct);
    let _ = parse_macro_input!(args as parse::Nothing);

    match item_struct.fields {
        syn::Fields::Named(ref mut fields) => {
            let field = syn::Field::parse_named.parse2(quote! {
                #[serde(default)]
                pub correlation_id: ::std::string::String
            });
            match field {
                Ok(field) => fields.named.insert(0, field),
                Err(err) => return err.to_compile_error().into(),
            }
        }
        _ => {
            return syn::Error::new_spanned(
                &item_struct.ident,
                "add_correlation_id only supports structs with named fields",
            ).to_compile_error().into();
        }
    }

    return quote! {#item_struct}.into();
}
