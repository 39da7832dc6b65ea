//! Interactive confirmation on stdin

use std::io::{self, Write};

use agentlink_core::symlink::ConfirmationRequest;

/// Ask a yes/no question; anything but `y` or `yes` is no
pub fn confirm(question: &str) -> io::Result<bool> {
    print!("{question} [y/N] ");
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let answer = input.trim();
    Ok(answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes"))
}

/// Confirmation callback for link operations
///
/// With `yes` every request is approved without reading stdin. A failed
/// read counts as no.
pub fn link_confirmer(yes: bool) -> impl FnMut(&ConfirmationRequest) -> bool {
    move |request| yes || confirm(&request.prompt()).unwrap_or(false)
}
