use std::fmt;

/// A 16-octet IPv6 address.
///
/// Parsing inside the codec is always octet-based (addresses arrive already
/// decoded from the wire); [`fmt::Display`] implements RFC 5952 canonical
/// textual form for logging and diagnostics only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ipv6Address([u8; 16]);

impl Ipv6Address {
    pub const fn new(octets: [u8; 16]) -> Self {
        Self(octets)
    }

    pub const fn octets(&self) -> [u8; 16] {
        self.0
    }

    fn groups(&self) -> [u16; 8] {
        let mut groups = [0u16; 8];
        for (i, group) in groups.iter_mut().enumerate() {
            *group = u16::from_be_bytes([self.0[i * 2], self.0[i * 2 + 1]]);
        }
        groups
    }

    /// Finds the longest run of two-or-more zero groups, preferring the
    /// leftmost run on ties, per RFC 5952 §4.2.3.
    fn best_zero_run(groups: &[u16; 8]) -> Option<(usize, usize)> {
        let mut best: Option<(usize, usize)> = None;
        let mut run_start = None;

        for (i, &g) in groups.iter().enumerate() {
            if g == 0 {
                if run_start.is_none() {
                    run_start = Some(i);
                }
            } else if let Some(start) = run_start.take() {
                consider_run(&mut best, start, i);
            }
        }
        if let Some(start) = run_start {
            consider_run(&mut best, start, groups.len());
        }

        best.filter(|(start, end)| end - start >= 2)
    }
}

fn consider_run(best: &mut Option<(usize, usize)>, start: usize, end: usize) {
    let len = end - start;
    let better = match best {
        Some((bs, be)) => len > *be - *bs,
        None => true,
    };
    if better {
        *best = Some((start, end));
    }
}

impl From<[u8; 16]> for Ipv6Address {
    fn from(octets: [u8; 16]) -> Self {
        Self(octets)
    }
}

impl fmt::Display for Ipv6Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let groups = self.groups();
        let zero_run = Self::best_zero_run(&groups);

        match zero_run {
            Some((start, end)) => {
                let head = groups[..start]
                    .iter()
                    .map(|g| format!("{g:x}"))
                    .collect::<Vec<_>>()
                    .join(":");
                let tail = groups[end..]
                    .iter()
                    .map(|g| format!("{g:x}"))
                    .collect::<Vec<_>>()
                    .join(":");
                write!(f, "{head}::{tail}")
            }
            None => {
                let text = groups
                    .iter()
                    .map(|g| format!("{g:x}"))
                    .collect::<Vec<_>>()
                    .join(":");
                write!(f, "{text}")
            }
        }
    }
}
