use serde::{Deserialize, Deserializer, Serialize, Serializer};

bitflags::bitflags! {
    /// Restart intent, persisted as the decimal text of its bits so the
    /// supervisor script can test them without a JSON parser.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RebootSignal: u32 {
        /// Set on every restart event
        const REBOOT = 1 << 0;
        /// Pull/update before relaunching
        const SYNC = 1 << 1;
        /// Skip slow bootstrap steps
        const FAST = 1 << 2;
    }
}

impl RebootSignal {
    /// Bits for a confirmed in-chat restart.
    pub fn for_request(sync: bool) -> Self {
        let mut signal = Self::REBOOT | Self::FAST;
        if sync {
            signal |= Self::SYNC;
        }
        signal
    }

    pub fn to_decimal(self) -> String {
        self.bits().to_string()
    }

    /// Parse the decimal form; unknown bits are kept, blank or zero is `None`.
    pub fn parse_decimal(raw: &str) -> Option<Self> {
        raw.trim()
            .parse::<u32>()
            .ok()
            .map(Self::from_bits_retain)
            .filter(|s| !s.is_empty())
    }

    /// Lower-case flag names joined by `|` (`reboot|fast`).
    pub fn names(self) -> String {
        let names: Vec<String> = self
            .iter_names()
            .map(|(name, _)| name.to_ascii_lowercase())
            .collect();
        if names.is_empty() {
            "none".into()
        } else {
            names.join("|")
        }
    }
}

impl std::fmt::Display for RebootSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:06b} {}", self.bits(), self.names())
    }
}

impl Serialize for RebootSignal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.bits())
    }
}

impl<'de> Deserialize<'de> for RebootSignal {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Older records stored the bitmask as a decimal string.
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Bits(u32),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Bits(bits) => Ok(Self::from_bits_retain(bits)),
            Raw::Text(text) => text
                .trim()
                .parse::<u32>()
                .map(Self::from_bits_retain)
                .map_err(|_| serde::de::Error::custom(format!("invalid signal bitmask '{text}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_always_sets_reboot_and_fast() {
        let plain = RebootSignal::for_request(false);
        assert_eq!(plain.bits(), 0b101);
        assert!(!plain.contains(RebootSignal::SYNC));

        let sync = RebootSignal::for_request(true);
        assert_eq!(sync.bits(), 0b111);
    }

    #[test]
    fn decimal_form_roundtrips_and_rejects_empty() {
        assert_eq!(RebootSignal::for_request(true).to_decimal(), "7");
        assert_eq!(RebootSignal::parse_decimal(" 5\n"), Some(RebootSignal::REBOOT | RebootSignal::FAST));
        assert_eq!(RebootSignal::parse_decimal("0"), None);
        assert_eq!(RebootSignal::parse_decimal(""), None);
        assert_eq!(RebootSignal::parse_decimal("abc"), None);
    }

    #[test]
    fn unknown_bits_survive_parsing() {
        let signal = RebootSignal::parse_decimal("9").unwrap();
        assert_eq!(signal.bits(), 9);
        assert!(signal.contains(RebootSignal::REBOOT));
    }

    #[test]
    fn display_is_binary_plus_names() {
        assert_eq!(RebootSignal::for_request(false).to_string(), "000101 reboot|fast");
        assert_eq!(RebootSignal::for_request(true).to_string(), "000111 reboot|sync|fast");
        assert_eq!(RebootSignal::empty().names(), "none");
    }

    #[test]
    fn serde_accepts_number_and_string() {
        let n: RebootSignal = serde_json::from_str("5").unwrap();
        let s: RebootSignal = serde_json::from_str("\"7\"").unwrap();
        assert_eq!(n, RebootSignal::for_request(false));
        assert_eq!(s, RebootSignal::for_request(true));
        assert_eq!(serde_json::to_string(&s).unwrap(), "7");
        assert!(serde_json::from_str::<RebootSignal>("\"seven\"").is_err());
    }
}
