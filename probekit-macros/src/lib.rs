//! Procedural macros for `probekit`.

mod utils;

use proc_macro::{Delimiter, Group, TokenStream, TokenTree};

/// Turns a plain function into a reactor test.
///
/// The body runs with a fresh `reactor: probekit::Reactor` in scope, and
/// the loop is driven to completion afterwards, so callbacks scheduled by
/// the body run before the test returns. Locals of the body, timers
/// included, stay alive until the loop is done.
///
/// The loop is appended after the body, so an early `return` skips it
/// and nothing scheduled by the body runs. Use an explicit
/// `reactor.run_loop()` before returning early.
///
/// ```rust,ignore
/// #[probekit::test]
/// fn fires() {
///     let _timer = reactor.schedule(0.01, || println!("tick")).unwrap();
/// }
/// ```
#[proc_macro_attribute]
pub fn test(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let mut tokens = item.into_iter().collect::<Vec<_>>();

    if utils::is_async(&tokens) {
        return utils::compile_error("probekit::test functions cannot be async");
    }

    let Some(pos) = utils::body_position(&tokens) else {
        return utils::compile_error("probekit::test expects a function with a body");
    };

    let body = match &tokens[pos] {
        TokenTree::Group(g) => g.stream().to_string(),
        _ => unreachable!(),
    };

    let new_body = format!(
        "{{
        let reactor = ::probekit::Reactor::new().expect(\"failed to create reactor\");
        {body};
        reactor.run_loop().expect(\"reactor loop failed\");
    }}"
    );

    let Ok(stream) = new_body.parse::<TokenStream>() else {
        return utils::compile_error("probekit::test could not expand the function body");
    };

    tokens[pos] = TokenTree::Group(Group::new(Delimiter::Brace, stream));

    let test_attr: TokenStream = "#[test] #[allow(redundant_semicolons)]".parse().unwrap_or_default();
    let mut result: Vec<TokenTree> = test_attr.into_iter().collect();
    result.extend(tokens);

    result.into_iter().collect()
}
