extern crate proc_macro;

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, punctuated::Punctuated, FnArg, ItemFn, Pat, PatType, Receiver, Token};

/// Runs the annotated method inside a transaction on its `session` argument:
/// committed on `Ok`, aborted on `Err`.
#[proc_macro_attribute]
pub fn tx(_args: TokenStream, input: TokenStream) -> TokenStream {
    let input_fn = parse_macro_input!(input as ItemFn);
    let vis = &input_fn.vis;
    let block = &input_fn.block;
    let fn_name = &input_fn.sig.ident;
    let fn_args = &input_fn.sig.inputs;
    let fn_return = &input_fn.sig.output;

    if !has_session(fn_args) {
        return syn::Error::new_spanned(&input_fn.sig, "#[tx] requires a `session` argument")
            .to_compile_error()
            .into();
    }
    let arg_list = forward_args(fn_args);

    let wrapped_fn_name = quote::format_ident!("{}_inner", fn_name);
    let fn_label = fn_name.to_string();
    let gen = quote! {
        #vis async fn #wrapped_fn_name(#fn_args) #fn_return {
            #block
        }

        #vis async fn #fn_name(#fn_args) #fn_return {
            session.start_transaction().await?;
            match Self::#wrapped_fn_name(#(#arg_list),*).await {
                Ok(result) => {
                    session.commit_transaction().await?;
                    Ok(result)
                },
                Err(e) => {
                    ::log::warn!("{}: transaction aborted: {}", #fn_label, e);
                    session.abort_transaction().await?;
                    Err(e)
                }
            }
        }
    };

    TokenStream::from(gen)
}

fn has_session(args: &Punctuated<FnArg, Token![,]>) -> bool {
    args.iter().any(|arg| match arg {
        FnArg::Typed(PatType { pat, .. }) => {
            matches!(pat.as_ref(), Pat::Ident(ident) if ident.ident == "session")
        }
        FnArg::Receiver(_) => false,
    })
}

/// Call arguments for the inner function, in declaration order.
fn forward_args(args: &Punctuated<FnArg, Token![,]>) -> Vec<proc_macro2::TokenStream> {
    args.iter()
        .map(|arg| match arg {
            FnArg::Typed(PatType { pat, .. }) => quote! { #pat },
            // `&self` and `&mut self` are reborrowed as they are.
            FnArg::Receiver(Receiver {
                reference: Some(_), ..
            }) => quote!(self),
            // An owned `self` moves into the inner call; the wrapper only
            // touches `session` afterwards.
            FnArg::Receiver(Receiver {
                reference: None, ..
            }) => quote!(self),
        })
        .collect()
}
