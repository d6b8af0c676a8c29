use proc_macro::{Delimiter, TokenStream, TokenTree};

/// Returns the position of the function body, the last brace group.
pub(crate) fn body_position(tokens: &[TokenTree]) -> Option<usize> {
    tokens
        .iter()
        .rposition(|t| matches!(t, TokenTree::Group(g) if g.delimiter() == Delimiter::Brace))
}

/// Returns `true` if the signature carries the `async` keyword.
pub(crate) fn is_async(tokens: &[TokenTree]) -> bool {
    tokens
        .iter()
        .any(|t| matches!(t, TokenTree::Ident(id) if id.to_string() == "async"))
}

/// Expands to a `compile_error!` carrying `msg`.
pub(crate) fn compile_error(msg: &str) -> TokenStream {
    format!("compile_error!({msg:?});")
        .parse()
        .unwrap_or_default()
}
