//! Conversions between host names and domain-component DNs.

use errors::{LookupError, LookupResult};
use ldap3::dn_escape;

/// One `type=value` assertion of a relative DN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeValue {
    pub attr_type: String,
    pub value: String
}

/// `some.corp.com` becomes `dc=some,dc=corp,dc=com`.
///
/// A single trailing dot is accepted; empty labels are not.
pub fn hostname_to_dn(hostname: &str) -> LookupResult<String> {
    let trimmed = hostname.strip_suffix('.').unwrap_or(hostname);
    let labels: Vec<&str> = trimmed.split('.').collect();
    if labels.iter().any(|label| label.is_empty()) {
        return Err(LookupError::invalid_dn(hostname, "host name has an empty label"));
    }

    Ok(labels
        .into_iter()
        .map(|label| format!("dc={}", dn_escape(label)))
        .collect::<Vec<_>>()
        .join(","))
}

/// `DC=some,DC=corp,DC=com` becomes `some.corp.com`.
///
/// Every RDN must carry a `dc` value; the first one is used.
pub fn dn_to_hostname(dn: &str) -> LookupResult<String> {
    let labels = parse_dn(dn)?
        .into_iter()
        .map(|rdn| {
            rdn.into_iter()
                .find(|ava| ava.attr_type.eq_ignore_ascii_case("dc"))
                .map(|ava| ava.value)
                .ok_or_else(|| LookupError::invalid_dn(dn, "relative DN has no dc component"))
        })
        .collect::<LookupResult<Vec<_>>>()?;

    Ok(labels.join("."))
}

/// Split a string DN into RDNs of attribute value assertions.
///
/// Handles backslash escapes, `\XX` hex pairs and multi-valued (`+`)
/// RDNs. Unescaped spaces around values are dropped.
pub fn parse_dn(dn: &str) -> LookupResult<Vec<Vec<AttributeValue>>> {
    let mut rdns = Vec::new();
    if dn.trim().is_empty() {
        return Ok(rdns);
    }

    let mut chars = dn.chars();
    let mut rdn = Vec::new();
    loop {
        let mut attr_type = String::new();
        loop {
            match chars.next() {
                Some('=') => break,
                Some(c @ (',' | '+' | '\\')) => {
                    return Err(LookupError::invalid_dn(
                        dn,
                        format!("unexpected {c:?} in attribute type")
                    ));
                }
                Some(c) => attr_type.push(c),
                None => return Err(LookupError::invalid_dn(dn, "missing '=' after attribute type"))
            }
        }
        let attr_type = attr_type.trim().to_string();
        if attr_type.is_empty() {
            return Err(LookupError::invalid_dn(dn, "empty attribute type"));
        }

        let mut value: Vec<u8> = Vec::new();
        let mut significant = 0;
        let mut leading = true;
        let mut buf = [0u8; 4];
        let terminator = loop {
            match chars.next() {
                None => break None,
                Some(c @ (',' | '+')) => break Some(c),
                Some('\\') => {
                    let escaped = chars
                        .next()
                        .ok_or_else(|| LookupError::invalid_dn(dn, "trailing backslash"))?;
                    match escaped.to_digit(16) {
                        Some(high) => {
                            let low = chars.next().and_then(|c| c.to_digit(16)).ok_or_else(|| {
                                LookupError::invalid_dn(dn, "incomplete hex escape")
                            })?;
                            let byte = u8::try_from(high * 16 + low)
                                .map_err(|_| LookupError::invalid_dn(dn, "bad hex escape"))?;
                            value.push(byte);
                        }
                        None => value.extend_from_slice(escaped.encode_utf8(&mut buf).as_bytes())
                    }
                    significant = value.len();
                    leading = false;
                }
                Some(' ') if leading => {}
                Some(c) => {
                    value.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
                    if c != ' ' {
                        significant = value.len();
                    }
                    leading = false;
                }
            }
        };
        value.truncate(significant);

        let value = String::from_utf8(value)
            .map_err(|_| LookupError::invalid_dn(dn, "escaped value is not valid UTF-8"))?;
        rdn.push(AttributeValue { attr_type, value });

        match terminator {
            Some('+') => continue,
            Some(_) => rdns.push(std::mem::take(&mut rdn)),
            None => {
                rdns.push(rdn);
                break;
            }
        }
    }

    Ok(rdns)
}
