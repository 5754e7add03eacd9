//! curl command rendering.

use std::borrow::Cow;
use std::fmt::Write;

use crate::convert::ReconstructedRequest;
use crate::error::{PxCurlError, Result};

/// Render `request` as a single shell-quoted curl command line.
///
/// Argument order is method, headers, body, then the target URL. Every
/// argument is quoted independently, so a shell splits the line back into
/// exactly the words built here, and it never spans more than one line.
pub fn render_curl(request: &ReconstructedRequest) -> Result<String> {
    let words = curl_args(request)
        .iter()
        .map(String::as_str)
        .map(quote_word)
        .collect::<Result<Vec<_>>>()?;
    Ok(words.join(" "))
}

/// Quote one argument for a POSIX shell.
///
/// Words holding control characters (a multi-line body, a tab in a header)
/// use bash's `$'...'` form with those characters escaped.
fn quote_word(word: &str) -> Result<String> {
    if word.contains('\0') {
        return Err(PxCurlError::Render("argument contains a nul byte".to_string()));
    }
    if !word.chars().any(|c| c.is_ascii_control()) {
        return shlex::try_quote(word)
            .map(Cow::into_owned)
            .map_err(|err| PxCurlError::Render(err.to_string()));
    }

    let mut quoted = String::with_capacity(word.len() + 3);
    quoted.push_str("$'");
    for c in word.chars() {
        match c {
            '\\' => quoted.push_str("\\\\"),
            '\'' => quoted.push_str("\\'"),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\t' => quoted.push_str("\\t"),
            c if c.is_ascii_control() => {
                let _ = write!(quoted, "\\x{:02x}", c as u32);
            }
            c => quoted.push(c),
        }
    }
    quoted.push('\'');
    Ok(quoted)
}

/// The curl argument vector for `request`, before quoting.
pub fn curl_args(request: &ReconstructedRequest) -> Vec<String> {
    let mut args = Vec::with_capacity(4 + request.headers.len() * 2);
    args.push("curl".to_string());
    args.push("-X".to_string());
    args.push(request.method.clone());

    for (name, value) in request.headers.iter() {
        args.push("-H".to_string());
        args.push(format!("{name}: {value}"));
    }

    if let Some(body) = &request.body {
        // curl reads `-d @file` from disk
        let flag = if body.starts_with('@') { "--data-raw" } else { "-d" };
        args.push(flag.to_string());
        args.push(body.clone());
    }

    if request.has_dot_segments {
        args.push("--path-as-is".to_string());
    }

    args.push(request.url.clone());
    args
}
