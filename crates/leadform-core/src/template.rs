//! `{{variable}}` substitution for notification and SMS templates.
//!
//! Substitution is a literal, case-sensitive, global replace of `{{name}}`
//! tokens. There is no nesting and there are no conditionals. Tokens naming
//! a variable that is not in the context are left in the output verbatim.
//! Replaced values are never re-scanned, so a value that itself contains
//! `{{...}}` is emitted as-is.

use std::collections::BTreeMap;

/// Variable name → replacement value.
pub type TemplateVars = BTreeMap<String, String>;

pub fn substitute(template: &str, vars: &TemplateVars) -> String {
  let mut out = String::with_capacity(template.len());
  let mut rest = template;

  while let Some(start) = rest.find("{{") {
    out.push_str(&rest[..start]);
    rest = &rest[start..];

    let hit = vars
      .iter()
      .find_map(|(name, value)| token_len(rest, name).map(|len| (len, value)));

    match hit {
      Some((len, value)) => {
        out.push_str(value);
        rest = &rest[len..];
      }
      None => {
        out.push('{');
        rest = &rest[1..];
      }
    }
  }

  out.push_str(rest);
  out
}

/// Length of `{{name}}` if `s` starts with it.
fn token_len(s: &str, name: &str) -> Option<usize> {
  s.strip_prefix("{{")?
    .strip_prefix(name)?
    .starts_with("}}")
    .then_some(name.len() + 4)
}

/// Build a [`TemplateVars`] map from `(name, value)` pairs.
pub fn vars<I, K, V>(pairs: I) -> TemplateVars
where
  I: IntoIterator<Item = (K, V)>,
  K: Into<String>,
  V: Into<String>,
{
  pairs
    .into_iter()
    .map(|(k, v)| (k.into(), v.into()))
    .collect()
}
