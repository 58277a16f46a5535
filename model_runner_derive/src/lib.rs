//! Procedural macros shared across the model runner workspace.

mod args;

use crate::args::Args;
use proc_macro::TokenStream;
use proc_macro2::Span;
use proc_macro2::Ident;
use quote::ToTokens;
use quote::quote;
use syn::parse_macro_input;

/// Wraps a fallible function body so that any `Err` returned from it is annotated with
/// `.context(format!(...))` before being propagated.
///
/// Works on both synchronous functions returning `Result<T, E>` and `async fn`s. The macro
/// accepts an optional leading `move` keyword (to force the wrapping closure/future to take
/// ownership of captured variables) followed by a `format!`-style argument list that may
/// reference the function's parameters.
///
/// ```ignore
/// #[context("Failed to open image at {url}")]
/// fn open(url: &str) -> anyhow::Result<Handle> {
///     // ...
/// }
/// ```
#[proc_macro_attribute]
pub fn context(args: TokenStream, input: TokenStream) -> TokenStream {
	let Args(move_token, format_args) = parse_macro_input!(args);
	let mut input = parse_macro_input!(input as syn::ItemFn);

	let body = &input.block;
	let return_type = &input.sig.output;
	let err = Ident::new("err", Span::mixed_site());

	let new_body = if input.sig.asyncness.is_some() {
		let return_type = match return_type {
			syn::ReturnType::Default => {
				return syn::Error::new_spanned(input, "function should return Result")
					.to_compile_error()
					.into();
			}
			syn::ReturnType::Type(_, return_type) => return_type,
		};
		let result = Ident::new("result", Span::mixed_site());
		quote! {
			let #result: #return_type = async #move_token { #body }.await;
			#result.map_err(|#err| #err.context(format!(#format_args)).into())
		}
	} else {
		let force_fn_once = Ident::new("force_fn_once", Span::mixed_site());
		quote! {
			// Moving a non-`Copy` value into the closure tells borrowck to always treat the
			// closure as a `FnOnce`, preventing some borrowing errors.
			let #force_fn_once = ::core::iter::empty::<()>();
			(#move_token || #return_type {
				::core::mem::drop(#force_fn_once);
				#body
			})().map_err(|#err| #err.context(format!(#format_args)).into())
		}
	};
	input.block.stmts = vec![syn::Stmt::Expr(syn::Expr::Verbatim(new_body), None)];

	input.into_token_stream().into()
}
