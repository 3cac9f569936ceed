use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, spanned::Spanned, ItemFn};

/// Marks a test that runs both natively and under `wasm-bindgen-test`.
///
/// Sync tests become `#[test]` natively. Async tests run on a current-thread
/// tokio runtime natively, since everything in the crate is single-threaded
/// (`Rc`/`RefCell`). On wasm32 both expand to `wasm_bindgen_test`.
#[proc_macro_attribute]
pub fn test(attr: TokenStream, item: TokenStream) -> TokenStream {
  let input = parse_macro_input!(item as ItemFn);

  let raw_args = proc_macro2::TokenStream::from(attr);
  if !raw_args.is_empty() {
    return TokenStream::from(
      syn::Error::new(
        raw_args.span(),
        "shared_resize_macro::test takes no arguments; make the function async to get an \
         async runtime",
      )
      .to_compile_error(),
    );
  }

  let is_async = input.sig.asyncness.is_some();

  // wasm_bindgen_test detects `async fn` on its own.
  let wasm_attr = quote!(wasm_bindgen_test::wasm_bindgen_test);

  let native_attr =
    if is_async { quote!(tokio::test(flavor = "current_thread")) } else { quote!(test) };

  let expanded = quote! {
      #[cfg_attr(target_arch = "wasm32", #wasm_attr)]
      #[cfg_attr(not(target_arch = "wasm32"), #native_attr)]
      #input
  };

  TokenStream::from(expanded)
}
