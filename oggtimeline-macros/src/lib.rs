use darling::Error;
use darling::ast::NestedMeta;
use quote::quote;
use syn::{Data, DeriveInput, Fields, ItemStruct, parse_macro_input};

use proc_macro::TokenStream;

/// Serializes every field in declaration order through `WriteBytesLe`.
#[proc_macro_derive(ToBytes)]
pub fn derive_to_bytes(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = input.ident;

    let fields: Vec<syn::Member> = match input.data {
        Data::Struct(ref s) => match s.fields {
            Fields::Named(ref nf) => nf
                .named
                .iter()
                .filter_map(|f| f.ident.clone().map(Into::into))
                .collect(),
            Fields::Unnamed(ref uf) => uf
                .unnamed
                .iter()
                .enumerate()
                .map(|(i, _)| syn::Index::from(i).into())
                .collect(),
            Fields::Unit => Vec::new(),
        },
        _ => {
            return TokenStream::from(
                syn::Error::new_spanned(&name, "ToBytes can only be derived for structs")
                    .to_compile_error(),
            );
        }
    };

    let expanded = quote! {
        impl crate::byteorder::WriteBytesLe for #name {
            fn write_le(&self, dst: &mut Vec<u8>) {
                #( crate::byteorder::WriteBytesLe::write_le(&self.#fields, dst); )*
            }
        }
    };

    TokenStream::from(expanded)
}

/// Attaches a fixed byte-string magic to a header view.
///
/// ```ignore
/// #[codec_magic(b"OpusHead")]
/// pub struct OpusHead<'a> { ... }
/// ```
///
/// generates `MAGIC` and a `matches(bytes)` prefix test on the struct.
#[proc_macro_attribute]
pub fn codec_magic(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = match NestedMeta::parse_meta_list(attr.into()) {
        Ok(v) => v,
        Err(e) => {
            return TokenStream::from(Error::from(e).write_errors());
        }
    };

    let Some(first) = args.first() else {
        return TokenStream::from(quote! {
            compile_error!("codec_magic expects a byte string, e.g. b\"OpusHead\"");
        });
    };

    let magic = match first {
        NestedMeta::Lit(syn::Lit::ByteStr(bs)) => bs.value(),
        _ => {
            return TokenStream::from(
                syn::Error::new_spanned(first, "codec_magic expects a byte string")
                    .to_compile_error(),
            );
        }
    };

    if magic.is_empty() {
        return TokenStream::from(
            syn::Error::new_spanned(first, "codec_magic must not be empty").to_compile_error(),
        );
    }

    let len = magic.len();
    let magic_tokens = quote! {[#(#magic),*]};

    let input = parse_macro_input!(item as ItemStruct);
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let expanded = quote! {
        #input

        impl #impl_generics #name #ty_generics #where_clause {
            pub const MAGIC: [u8; #len] = #magic_tokens;

            /// Whether `bytes` starts with this packet's magic.
            pub fn matches(bytes: &[u8]) -> bool {
                bytes.starts_with(&Self::MAGIC)
            }
        }
    };
    TokenStream::from(expanded)
}
