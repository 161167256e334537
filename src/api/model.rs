use serde::Deserialize;

/// Query parameters of `/nic/update`.
#[derive(Deserialize, Debug, Clone, Default, Eq, PartialEq)]
pub(super) struct UpdateParams {
    pub hostname: Option<String>,
    pub myip: Option<String>,
}

/// The target of `/lookup/{type}/{hostname}` or `/lookup/{hostname}`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub(super) struct LookupTarget {
    pub rtype: String,
    pub hostname: String,
}

impl LookupTarget {
    pub fn parse(path: &str) -> Self {
        let path = path.trim_start_matches('/');
        match path.split_once('/') {
            Some((rtype, hostname)) => LookupTarget {
                rtype: rtype.to_ascii_uppercase(),
                hostname: hostname.to_string(),
            },
            None => LookupTarget {
                rtype: "A".to_string(),
                hostname: path.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_type_defaults_to_a() {
        assert_eq!(
            LookupTarget::parse("home.example.com"),
            LookupTarget {
                rtype: "A".into(),
                hostname: "home.example.com".into()
            }
        );
        assert_eq!(
            LookupTarget::parse("/aaaa/home.example.com"),
            LookupTarget {
                rtype: "AAAA".into(),
                hostname: "home.example.com".into()
            }
        );
    }
}
