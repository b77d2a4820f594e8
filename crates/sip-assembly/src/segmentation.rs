use sip_types::SipMetrics;

/// Decides, per incoming domain object, whether the current SIP should be
/// closed before the object is added.
///
/// Strategies see the metrics of the container as it stands *before* the
/// object is folded in. They must be pure: no mutation, no state carried
/// between calls. The assembler never splits a container holding zero AIUs,
/// whatever the strategy answers.
pub trait SegmentationStrategy<D> {
    fn should_start_new_sip(&self, domain_object: &D, metrics: &SipMetrics) -> bool;
}

impl<D, F> SegmentationStrategy<D> for F
where
    F: Fn(&D, &SipMetrics) -> bool,
{
    fn should_start_new_sip(&self, domain_object: &D, metrics: &SipMetrics) -> bool {
        self(domain_object, metrics)
    }
}

/// Never splits: everything lands in a single SIP.
#[derive(Clone, Copy, Debug, Default)]
pub struct Never;

impl<D> SegmentationStrategy<D> for Never {
    fn should_start_new_sip(&self, _: &D, _: &SipMetrics) -> bool {
        false
    }
}

/// Fires when `count` is a positive multiple of `max`. A `max` of zero never fires.
fn multiple_of(count: u64, max: u64) -> bool {
    max > 0 && count > 0 && count % max == 0
}

/// Splits every `max` AIUs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MaxAius(pub u64);

impl<D> SegmentationStrategy<D> for MaxAius {
    fn should_start_new_sip(&self, _: &D, metrics: &SipMetrics) -> bool {
        multiple_of(metrics.num_aius(), self.0)
    }
}

/// Splits every `max` digital objects.
///
/// The check runs before an object is added, so a container may overshoot
/// the limit by the digital objects of a single AIU.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MaxDigitalObjects(pub u64);

impl<D> SegmentationStrategy<D> for MaxDigitalObjects {
    fn should_start_new_sip(&self, _: &D, metrics: &SipMetrics) -> bool {
        multiple_of(metrics.num_digital_objects(), self.0)
    }
}

/// Splits once the PDI document has reached `max` bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MaxPdiSize(pub u64);

impl<D> SegmentationStrategy<D> for MaxPdiSize {
    fn should_start_new_sip(&self, _: &D, metrics: &SipMetrics) -> bool {
        metrics.pdi_size() >= self.0
    }
}

/// Splits once embedded content has reached `max` bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MaxDigitalObjectsSize(pub u64);

impl<D> SegmentationStrategy<D> for MaxDigitalObjectsSize {
    fn should_start_new_sip(&self, _: &D, metrics: &SipMetrics) -> bool {
        metrics.digital_objects_size() >= self.0
    }
}

/// Splits once PDI plus content has reached `max` bytes. This is a soft
/// limit: a SIP may exceed it by one domain object's contribution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MaxSipSize(pub u64);

impl<D> SegmentationStrategy<D> for MaxSipSize {
    fn should_start_new_sip(&self, _: &D, metrics: &SipMetrics) -> bool {
        metrics.sip_size() >= self.0
    }
}

/// Logical OR over a list of strategies.
pub struct Combining<D> {
    strategies: Vec<Box<dyn SegmentationStrategy<D>>>,
}

impl<D> Combining<D> {
    pub fn new() -> Self {
        Self {
            strategies: Vec::new(),
        }
    }

    /// Add a constituent strategy.
    pub fn with(mut self, strategy: impl SegmentationStrategy<D> + 'static) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    pub fn push(&mut self, strategy: Box<dyn SegmentationStrategy<D>>) {
        self.strategies.push(strategy);
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

impl<D> Default for Combining<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> FromIterator<Box<dyn SegmentationStrategy<D>>> for Combining<D> {
    fn from_iter<I: IntoIterator<Item = Box<dyn SegmentationStrategy<D>>>>(iter: I) -> Self {
        Self {
            strategies: iter.into_iter().collect(),
        }
    }
}

impl<D> SegmentationStrategy<D> for Combining<D> {
    fn should_start_new_sip(&self, domain_object: &D, metrics: &SipMetrics) -> bool {
        self.strategies
            .iter()
            .any(|s| s.should_start_new_sip(domain_object, metrics))
    }
}

impl<D> std::fmt::Debug for Combining<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Combining")
            .field("strategies", &self.strategies.len())
            .finish()
    }
}

pub fn by_max_aius(max: u64) -> MaxAius {
    MaxAius(max)
}

pub fn by_max_digital_objects(max: u64) -> MaxDigitalObjects {
    MaxDigitalObjects(max)
}

pub fn by_max_pdi_size(max: u64) -> MaxPdiSize {
    MaxPdiSize(max)
}

pub fn by_max_digital_objects_size(max: u64) -> MaxDigitalObjectsSize {
    MaxDigitalObjectsSize(max)
}

pub fn by_max_sip_size(max: u64) -> MaxSipSize {
    MaxSipSize(max)
}

/// Combine strategies with logical OR.
pub fn combining<D>(strategies: impl IntoIterator<Item = Box<dyn SegmentationStrategy<D>>>) -> Combining<D> {
    strategies.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn metrics(aius: u64, objects: u64, pdi: u64, content: u64) -> SipMetrics {
        SipMetrics::from_counts(aius, objects, pdi, content)
    }

    #[test]
    fn max_aius_fires_on_positive_multiples() {
        let s = by_max_aius(3);
        assert!(!SegmentationStrategy::<()>::should_start_new_sip(&s, &(), &metrics(0, 0, 0, 0)));
        assert!(!SegmentationStrategy::<()>::should_start_new_sip(&s, &(), &metrics(2, 0, 0, 0)));
        assert!(SegmentationStrategy::<()>::should_start_new_sip(&s, &(), &metrics(3, 0, 0, 0)));
        assert!(SegmentationStrategy::<()>::should_start_new_sip(&s, &(), &metrics(6, 0, 0, 0)));
    }

    #[test]
    fn max_digital_objects_fires_on_positive_multiples() {
        let s = by_max_digital_objects(2);
        assert!(!SegmentationStrategy::<()>::should_start_new_sip(&s, &(), &metrics(0, 0, 0, 0)));
        assert!(!SegmentationStrategy::<()>::should_start_new_sip(&s, &(), &metrics(1, 1, 0, 0)));
        assert!(SegmentationStrategy::<()>::should_start_new_sip(&s, &(), &metrics(1, 2, 0, 0)));
        assert!(!SegmentationStrategy::<()>::should_start_new_sip(&s, &(), &metrics(9, 3, 0, 0)));
        assert!(SegmentationStrategy::<()>::should_start_new_sip(&s, &(), &metrics(1, 4, 0, 0)));
    }

    #[test]
    fn zero_threshold_disables_modulo_strategies() {
        let m = metrics(5, 5, 0, 0);
        assert!(!SegmentationStrategy::<()>::should_start_new_sip(&by_max_aius(0), &(), &m));
        assert!(!SegmentationStrategy::<()>::should_start_new_sip(&by_max_digital_objects(0), &(), &m));
    }

    #[test]
    fn size_strategies_use_greater_or_equal() {
        let m = metrics(1, 1, 40, 60);
        assert!(SegmentationStrategy::<()>::should_start_new_sip(&by_max_pdi_size(40), &(), &m));
        assert!(!SegmentationStrategy::<()>::should_start_new_sip(&by_max_pdi_size(41), &(), &m));
        assert!(SegmentationStrategy::<()>::should_start_new_sip(&by_max_digital_objects_size(60), &(), &m));
        assert!(SegmentationStrategy::<()>::should_start_new_sip(&by_max_sip_size(100), &(), &m));
        assert!(!SegmentationStrategy::<()>::should_start_new_sip(&by_max_sip_size(101), &(), &m));
    }

    #[test]
    fn closures_are_strategies() {
        let by_value = |n: &u32, _: &SipMetrics| *n > 10;
        assert!(by_value.should_start_new_sip(&11, &SipMetrics::new()));
        assert!(!by_value.should_start_new_sip(&3, &SipMetrics::new()));
    }

    #[test]
    fn empty_combinator_never_fires() {
        let c: Combining<()> = Combining::new();
        assert!(c.is_empty());
        assert!(!c.should_start_new_sip(&(), &metrics(9, 9, 9, 9)));
    }

    #[test]
    fn never_never_fires() {
        assert!(!SegmentationStrategy::<()>::should_start_new_sip(&Never, &(), &metrics(u64::MAX, 1, 1, 1)));
    }

    proptest! {
        #[test]
        fn combining_is_logical_or(
            aius in 0u64..50,
            objects in 0u64..50,
            pdi in 0u64..5_000,
            content in 0u64..5_000,
            max_aius in 0u64..10,
            max_sip in 0u64..10_000,
        ) {
            let m = metrics(aius, objects, pdi, content);
            let a = by_max_aius(max_aius);
            let b = by_max_sip_size(max_sip);
            let expected = SegmentationStrategy::<()>::should_start_new_sip(&a, &(), &m)
                || SegmentationStrategy::<()>::should_start_new_sip(&b, &(), &m);
            let c = Combining::<()>::new().with(a).with(b);
            prop_assert_eq!(c.should_start_new_sip(&(), &m), expected);
        }
    }
}
