extern crate proc_macro;

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, FnArg, ItemFn, PatType};

/// Runs the method body inside a transaction on its `tx` argument.
///
/// The body is replayed with backoff when it fails with a transient
/// transaction error, so every argument besides `tx` must be a reference or
/// `Copy`.
#[proc_macro_attribute]
pub fn tx(_args: TokenStream, input: TokenStream) -> TokenStream {
    let input_fn = parse_macro_input!(input as ItemFn);
    let vis = &input_fn.vis;
    let block = &input_fn.block;
    let fn_name = &input_fn.sig.ident;
    let fn_args = &input_fn.sig.inputs;
    let fn_return = &input_fn.sig.output;
    let attrs = &input_fn.attrs;

    let arg_list: Vec<_> = fn_args
        .iter()
        .map(|arg| match arg {
            FnArg::Typed(PatType { pat, .. }) => quote! { #pat },
            FnArg::Receiver(_) => quote!(self),
        })
        .collect();

    let wrapped_fn_name = quote::format_ident!("{}_inner", fn_name);
    let gen = quote! {
        #[doc(hidden)]
        #vis async fn #wrapped_fn_name(#fn_args) #fn_return {
            #block
        }

        #(#attrs)*
        #vis async fn #fn_name(#fn_args) #fn_return {
            let mut attempt = 0;
            loop {
                tx.start_transaction().await?;
                match Self::#wrapped_fn_name(#(#arg_list),*).await {
                    Ok(result) => {
                        if tx.commit(attempt).await? {
                            return Ok(result);
                        }
                    }
                    Err(err) => {
                        tx.abort_transaction().await?;
                        if attempt >= ::model::tx::MAX_ATTEMPTS
                            || !::model::tx::TxError::is_transient(&err)
                        {
                            return Err(err);
                        }
                    }
                }
                attempt += 1;
                ::model::tx::backoff(attempt).await;
            }
        }
    };

    TokenStream::from(gen)
}
