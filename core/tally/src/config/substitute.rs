use std::{borrow::Cow, env::VarError};

use super::error::InvalidSubstitutionError;

/// Replaces the pattern `${VAR_NAME}` by the value of the `VAR_NAME` environment variable.
///
/// The pattern can be escaped to prevent its replacement: `\${NOT_A_VAR}` gives `${NOT_A_VAR}`.
/// Variable names may only contain ASCII letters, digits and underscores.
/// If a variable does not exist or is invalid, returns an error.
pub fn substitute_env(input: &str) -> Result<Cow<'_, str>, InvalidSubstitutionError> {
    substitute_with(input, |name| std::env::var(name))
}

fn substitute_with<F>(input: &str, lookup: F) -> Result<Cow<'_, str>, InvalidSubstitutionError>
where
    F: Fn(&str) -> Result<String, VarError>,
{
    if !input.contains("${") {
        return Ok(Cow::Borrowed(input));
    }

    let mut res = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(begin) = rest.find("${") {
        if begin > 0 && rest.as_bytes()[begin - 1] == b'\\' {
            // escaped: drop the backslash, keep the rest verbatim
            res.push_str(&rest[..begin - 1]);
            res.push_str("${");
            rest = &rest[begin + 2..];
            continue;
        }

        res.push_str(&rest[..begin]);
        let after = &rest[begin + 2..];
        let end = after.find('}').ok_or(InvalidSubstitutionError::WrongSyntax)?;
        let name = &after[..end];
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(InvalidSubstitutionError::InvalidName(name.to_owned()));
        }
        match lookup(name) {
            Ok(value) => res.push_str(&value),
            Err(VarError::NotPresent) => return Err(InvalidSubstitutionError::Missing(name.to_owned())),
            Err(VarError::NotUnicode(_)) => return Err(InvalidSubstitutionError::InvalidValue(name.to_owned())),
        }
        rest = &after[end + 1..];
    }
    res.push_str(rest);
    Ok(Cow::Owned(res))
}
