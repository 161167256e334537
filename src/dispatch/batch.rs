use std::fmt;
use std::net::IpAddr;

/// The outcome of one requested hostname, in the dyndns2 return-code vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// The provider applied the new address.
    Good(IpAddr),
    /// Nothing needed changing, or the provider didn't report the record as applied.
    NoChange(IpAddr),
    /// No provider manages a zone containing the hostname.
    NoHost,
    /// The provider failed to apply the update.
    DnsErr,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Good(ip) => write!(f, "good {ip}"),
            Status::NoChange(ip) => write!(f, "nochg {ip}"),
            Status::NoHost => f.write_str("nohost"),
            Status::DnsErr => f.write_str("dnserr"),
        }
    }
}

/// One status per requested hostname, in request order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateBatch {
    hosts: Vec<String>,
    statuses: Vec<Status>,
}

impl UpdateBatch {
    /// A batch with every host defaulted to `nochg ip`.
    pub(super) fn new(hosts: Vec<String>, ip: IpAddr) -> Self {
        let statuses = vec![Status::NoChange(ip); hosts.len()];
        UpdateBatch { hosts, statuses }
    }

    pub(super) fn set(&mut self, idx: usize, status: Status) {
        self.statuses[idx] = status;
    }

    #[must_use]
    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }

    #[must_use]
    pub fn statuses(&self) -> &[Status] {
        &self.statuses
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Status)> {
        self.hosts
            .iter()
            .map(String::as_str)
            .zip(self.statuses.iter().copied())
    }
}

impl fmt::Display for UpdateBatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, status) in self.statuses.iter().enumerate() {
            if idx > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{status}")?;
        }
        Ok(())
    }
}
