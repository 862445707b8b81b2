#[cfg(test)]
mod tests {
    use clicktrackrs::meter::{MAX_NUMERATOR, MIN_NUMERATOR, VALID_DENOMINATORS};
    use clicktrackrs::{Emphasis, MeterError, MeterSpec};

    fn all_meters() -> impl Iterator<Item = MeterSpec> {
        (MIN_NUMERATOR..=MAX_NUMERATOR).flat_map(|n| {
            VALID_DENOMINATORS
                .iter()
                .map(move |&d| MeterSpec::new(n, d).unwrap())
        })
    }

    #[test]
    fn test_emphasis_sets_partition_the_bar() {
        for meter in all_meters() {
            let mut positions: Vec<u32> = meter
                .strong_beats()
                .into_iter()
                .chain(meter.medium_beats())
                .chain(meter.weak_beats())
                .collect();
            positions.sort_unstable();
            let expected: Vec<u32> = (1..=meter.numerator()).collect();
            assert_eq!(positions, expected, "{} is not partitioned", meter);
            assert_eq!(meter.emphasis(1), Emphasis::Strong, "{}", meter);
        }
    }

    #[test]
    fn test_groups_cover_the_bar() {
        for meter in all_meters() {
            assert_eq!(meter.groups().iter().sum::<u32>(), meter.numerator(), "{}", meter);
        }
    }

    #[test]
    fn test_compound_meters_group_in_threes() {
        assert_eq!(MeterSpec::SIX_EIGHT.strong_beats(), vec![1, 4]);
        assert_eq!(MeterSpec::NINE_EIGHT.strong_beats(), vec![1, 4, 7]);
        assert_eq!(MeterSpec::TWELVE_EIGHT.weak_beats().len(), 8);
    }

    #[test]
    fn test_odd_meters() {
        assert_eq!(MeterSpec::FIVE_FOUR.groups(), vec![2, 3]);
        assert_eq!(MeterSpec::FIVE_FOUR.medium_beats(), vec![3]);
        assert_eq!(MeterSpec::SEVEN_EIGHT.emphasis(5), Emphasis::Medium);
        assert_eq!(MeterSpec::THREE_FOUR.strong_beats(), vec![1]);
    }

    #[test]
    fn test_invalid_meters_are_rejected() {
        assert_eq!(
            MeterSpec::new(0, 4),
            Err(MeterError::Numerator {
                value: 0,
                min: MIN_NUMERATOR,
                max: MAX_NUMERATOR
            })
        );
        assert_eq!(MeterSpec::new(4, 3), Err(MeterError::Denominator(3)));
        assert!(matches!("four/four".parse::<MeterSpec>(), Err(MeterError::Parse(_))));
    }

    #[test]
    fn test_parse_and_display_agree() {
        let meter: MeterSpec = " 7/8 ".parse().unwrap();
        assert_eq!(meter, MeterSpec::SEVEN_EIGHT);
        assert_eq!(meter.to_string(), "7/8");
    }
}
