//! Property tests over the pure computation cores: estimate totals and the
//! labor calculator.

use chrono::Utc;
use effibuild_api::entities::labor_rate::{ComplexityFactors, Model as LaborRateModel};
use effibuild_api::services::estimates::{materials_total, EstimateMaterialInput};
use effibuild_api::services::labor::{compute, Complexity};
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

fn decimal_in_cents(max_units: i64) -> impl Strategy<Value = Decimal> {
    // Positive amounts with two decimal places, the shape real prices take
    (1..max_units * 100).prop_map(|cents| Decimal::new(cents, 2))
}

fn material_input() -> impl Strategy<Value = EstimateMaterialInput> {
    (decimal_in_cents(1_000), decimal_in_cents(10_000)).prop_map(|(quantity, unit_price)| {
        EstimateMaterialInput {
            name: "material".to_string(),
            description: None,
            quantity,
            unit_price,
            unit: "unit".to_string(),
            ai_recommended: false,
        }
    })
}

fn rate_model(project_type: &str) -> LaborRateModel {
    LaborRateModel {
        id: Uuid::new_v4(),
        client_id: Uuid::new_v4(),
        project_type: project_type.to_string(),
        base_rate: dec!(75),
        complexity_factors: ComplexityFactors {
            low: dec!(1),
            medium: dec!(1.3),
            high: dec!(1.6),
        },
        created_at: Utc::now(),
        updated_at: None,
    }
}

proptest! {
    #[test]
    fn total_equals_sum_of_line_products(materials in prop::collection::vec(material_input(), 1..20)) {
        let expected: Decimal = materials.iter().map(|m| m.quantity * m.unit_price).sum();
        prop_assert_eq!(materials_total(&materials), expected);
    }

    #[test]
    fn total_is_order_independent(mut materials in prop::collection::vec(material_input(), 2..12)) {
        let forward = materials_total(&materials);
        materials.reverse();
        prop_assert_eq!(materials_total(&materials), forward);
    }

    #[test]
    fn adding_known_factors_never_decreases_hours(
        area in decimal_in_cents(5_000),
        factor_count in 0usize..3,
    ) {
        let all_factors = ["difficult_access", "height_work", "weather_conditions"];
        let rate = rate_model("framing");

        let fewer: Vec<String> = all_factors[..factor_count].iter().map(|s| s.to_string()).collect();
        let more: Vec<String> = all_factors[..factor_count + 1].iter().map(|s| s.to_string()).collect();

        let hours_fewer = compute(&rate, area, Complexity::Medium, &fewer).hours;
        let hours_more = compute(&rate, area, Complexity::Medium, &more).hours;
        prop_assert!(hours_more >= hours_fewer);
    }

    #[test]
    fn unknown_factors_never_change_the_result(
        area in decimal_in_cents(5_000),
        tag in "[a-z_]{1,20}",
    ) {
        prop_assume!(!["difficult_access", "height_work", "weather_conditions"].contains(&tag.as_str()));

        let rate = rate_model("roofing");
        let baseline = compute(&rate, area, Complexity::Low, &[]);
        let tagged = compute(&rate, area, Complexity::Low, &[tag]);
        prop_assert_eq!(baseline.hours, tagged.hours);
        prop_assert_eq!(baseline.total_cost, tagged.total_cost);
    }

    #[test]
    fn labor_cost_is_hours_times_rate(area in decimal_in_cents(5_000)) {
        let rate = rate_model("drywall");
        let result = compute(&rate, area, Complexity::High, &["height_work".to_string()]);
        prop_assert_eq!(result.total_cost, result.hours * result.rate);
    }
}
