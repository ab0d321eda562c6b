//! Input validation tests for catalog values, uploads and accounts

use proptest::prelude::*;
use shared::nutrition::{NutrientProfile, PortionNutrition, Threshold};
use shared::validation::*;

mod unit_tests {
    use super::*;

    #[test]
    fn catalog_values() {
        let profile = NutrientProfile::new(175.0, 3.0, 0.3, 0.4, 40.0);
        assert!(validate_portion_nutrition(&PortionNutrition::new(profile, profile)).is_ok());

        let broken = NutrientProfile::new(175.0, -3.0, 0.3, 0.4, 40.0);
        assert!(validate_portion_nutrition(&PortionNutrition::new(profile, broken)).is_err());
    }

    #[test]
    fn threshold_values() {
        assert!(validate_threshold(&Threshold::new(700.0, 20.0, 20.0, 8.0, 100.0)).is_ok());
        assert!(validate_threshold(&Threshold::new(f64::INFINITY, 20.0, 20.0, 8.0, 100.0)).is_err());
    }

    #[test]
    fn upload_checks() {
        assert!(validate_image_content_type("image/png").is_ok());
        assert!(validate_image_content_type("image/jpeg; charset=binary").is_ok());
        assert!(validate_image_content_type("application/pdf").is_err());
        assert!(validate_file_name("nampan.jpg").is_ok());
        assert!(validate_file_name("../nampan.jpg").is_err());
    }

    #[test]
    fn account_checks() {
        assert!(validate_email("petugas@sekolah.sch.id").is_ok());
        assert!(validate_email("petugas").is_err());
        assert!(validate_password("rahasia").is_ok());
        assert!(validate_password("12345").is_err());
    }
}

mod property_tests {
    use super::*;

    proptest! {
        #[test]
        fn non_negative_finite_values_pass(value in 0.0f64..1.0e6) {
            prop_assert!(validate_nutrient_value(value).is_ok());
        }

        #[test]
        fn negative_values_fail(value in -1.0e6f64..-1.0e-9) {
            prop_assert!(validate_nutrient_value(value).is_err());
        }

        #[test]
        fn quantities_must_be_positive(quantity in -100.0f64..=0.0) {
            prop_assert!(validate_quantity(quantity).is_err());
        }

        #[test]
        fn confidence_in_unit_interval(confidence in 0.0f64..=1.0) {
            prop_assert!(validate_confidence(confidence).is_ok());
        }

        #[test]
        fn conf_threshold_excludes_zero(conf in 1.0e-6f64..=1.0) {
            prop_assert!(validate_conf_threshold(conf).is_ok());
            prop_assert!(validate_conf_threshold(0.0).is_err());
        }
    }
}
