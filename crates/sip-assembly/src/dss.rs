use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Supplies the DSS id of each new SIP.
///
/// Called exactly once per physical container, when it is opened.
pub trait DssIdSupplier {
    fn next_id(&mut self) -> String;
}

impl<F: FnMut() -> String> DssIdSupplier for F {
    fn next_id(&mut self) -> String {
        self()
    }
}

/// Produces the variable part of a DSS id.
pub trait PostfixStrategy {
    fn next_postfix(&mut self) -> String;
}

/// `prefix` followed by a postfix from `P`.
#[derive(Clone, Debug)]
pub struct PrefixDssIdSupplier<P> {
    prefix: String,
    postfix: P,
}

impl<P: PostfixStrategy> PrefixDssIdSupplier<P> {
    pub fn new(prefix: impl Into<String>, postfix: P) -> Self {
        Self {
            prefix: prefix.into(),
            postfix,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl PrefixDssIdSupplier<SequentialPostfix> {
    /// `prefix0001`, `prefix0002`, ...
    pub fn sequential(prefix: impl Into<String>) -> Self {
        Self::new(prefix, SequentialPostfix::default())
    }
}

impl PrefixDssIdSupplier<TimestampPostfix> {
    pub fn timestamped(prefix: impl Into<String>) -> Self {
        Self::new(prefix, TimestampPostfix::default())
    }
}

impl PrefixDssIdSupplier<RandomPostfix> {
    pub fn random(prefix: impl Into<String>) -> Self {
        Self::new(prefix, RandomPostfix)
    }
}

impl<P: PostfixStrategy> DssIdSupplier for PrefixDssIdSupplier<P> {
    fn next_id(&mut self) -> String {
        format!("{}{}", self.prefix, self.postfix.next_postfix())
    }
}

/// Zero-padded counter starting at 1.
#[derive(Clone, Debug)]
pub struct SequentialPostfix {
    next: u64,
    width: usize,
}

impl SequentialPostfix {
    pub fn new(start: u64, width: usize) -> Self {
        Self { next: start, width }
    }
}

impl Default for SequentialPostfix {
    fn default() -> Self {
        Self::new(1, 4)
    }
}

impl PostfixStrategy for SequentialPostfix {
    fn next_postfix(&mut self) -> String {
        let value = self.next;
        self.next += 1;
        format!("{value:0width$}", width = self.width)
    }
}

/// UTC timestamp with millisecond precision.
///
/// A timestamp at or before the latest one issued (same millisecond, or the
/// clock stepped back) reuses the latest with a `-N` suffix, so postfixes
/// never repeat within one supplier.
#[derive(Clone, Debug, Default)]
pub struct TimestampPostfix {
    latest: String,
    repeats: u32,
}

impl TimestampPostfix {
    fn postfix_at(&mut self, now: DateTime<Utc>) -> String {
        // fixed-width digits, so string order is time order
        let stamp = now.format("%Y%m%d%H%M%S%3f").to_string();
        if stamp <= self.latest {
            self.repeats += 1;
            format!("{}-{}", self.latest, self.repeats)
        } else {
            self.latest = stamp.clone();
            self.repeats = 0;
            stamp
        }
    }
}

impl PostfixStrategy for TimestampPostfix {
    fn next_postfix(&mut self) -> String {
        self.postfix_at(Utc::now())
    }
}

/// Time-ordered UUID (v7) in simple form.
#[derive(Clone, Copy, Debug, Default)]
pub struct RandomPostfix;

impl PostfixStrategy for RandomPostfix {
    fn next_postfix(&mut self) -> String {
        Uuid::now_v7().simple().to_string()
    }
}
