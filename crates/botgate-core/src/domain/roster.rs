//! Static allow-lists of reader and power identities.

use std::collections::HashSet;

/// Reader and power identity sets, loaded once at startup.
///
/// Membership is an exact string match: no case folding or trimming. The
/// empty identity (a caller the host could not identify) is never a member.
#[derive(Debug, Clone, Default)]
pub struct StaticRoster {
    readers: HashSet<String>,
    powers: HashSet<String>,
}

impl StaticRoster {
    pub fn new<R, P>(readers: R, powers: P) -> Self
    where
        R: IntoIterator,
        R::Item: Into<String>,
        P: IntoIterator,
        P::Item: Into<String>,
    {
        Self {
            readers: identities(readers),
            powers: identities(powers),
        }
    }

    pub fn is_reader(&self, identity: &str) -> bool {
        !identity.is_empty() && self.readers.contains(identity)
    }

    pub fn is_power(&self, identity: &str) -> bool {
        !identity.is_empty() && self.powers.contains(identity)
    }

    pub fn reader_count(&self) -> usize {
        self.readers.len()
    }

    pub fn power_count(&self) -> usize {
        self.powers.len()
    }
}

fn identities<I>(items: I) -> HashSet<String>
where
    I: IntoIterator,
    I::Item: Into<String>,
{
    items
        .into_iter()
        .map(Into::into)
        .filter(|identity: &String| !identity.is_empty())
        .collect()
}
