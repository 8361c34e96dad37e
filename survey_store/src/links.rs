//! Per-participant voting links.

/// The link a participant follows to vote: `<base-url>/vote?email=<email>`.
pub fn vote_link(base_url: &str, email: &str) -> String {
    format!(
        "{}/vote?email={}",
        base_url.trim_end_matches('/'),
        encode_query_value(email.trim())
    )
}

/// Percent-encodes everything but the unreserved characters of RFC 3986.
pub fn encode_query_value(value: &str) -> String {
    let mut res = String::with_capacity(value.len());
    for b in value.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                res.push(b as char)
            }
            _ => res.push_str(&format!("%{:02X}", b)),
        }
    }
    res
}

/// Reads the `email` query parameter back from a voting link.
pub fn email_from_link(link: &str) -> Option<String> {
    let (_, query) = link.split_once('?')?;
    query
        .split('&')
        .filter_map(|kv| kv.split_once('='))
        .find(|(k, _)| *k == "email")
        .and_then(|(_, v)| decode_query_value(v))
}

fn decode_query_value(value: &str) -> Option<String> {
    let bytes = value.as_bytes();
    let mut res: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut idx = 0;
    while idx < bytes.len() {
        match bytes[idx] {
            b'%' => {
                let hex = value.get(idx + 1..idx + 3)?;
                if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
                    return None;
                }
                res.push(u8::from_str_radix(hex, 16).ok()?);
                idx += 3;
            }
            b'+' => {
                res.push(b' ');
                idx += 1;
            }
            b => {
                res.push(b);
                idx += 1;
            }
        }
    }
    String::from_utf8(res).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_encodes_email() {
        assert_eq!(
            vote_link("http://localhost:8080/", "ana+survey@x.com"),
            "http://localhost:8080/vote?email=ana%2Bsurvey%40x.com"
        );
    }

    #[test]
    fn non_ascii_email() {
        assert_eq!(encode_query_value("é"), "%C3%A9");
    }

    #[test]
    fn email_back_from_link() {
        let link = vote_link("https://survey.example", "Ana.Lee+1@x.com");
        assert_eq!(email_from_link(&link).as_deref(), Some("Ana.Lee+1@x.com"));
        assert_eq!(email_from_link("https://survey.example/vote"), None);
        assert_eq!(email_from_link("https://survey.example/vote?email=%zz"), None);
    }

    #[test]
    fn escapes_need_two_hex_digits() {
        assert_eq!(decode_query_value("a%+1b"), None);
        assert_eq!(decode_query_value("a%-1b"), None);
        assert_eq!(decode_query_value("a%4"), None);
        assert_eq!(decode_query_value("a%40b").as_deref(), Some("a@b"));
    }
}
