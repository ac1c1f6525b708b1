//! Static reference tables: reporting frameworks, industry materiality and
//! per-ticker forecast growth rates.

use serde::Serialize;

use crate::{Framework, Industry};

/// Built-in reporting frameworks, in display order
pub fn builtin_frameworks() -> Vec<Framework> {
    vec![
        Framework::new("GRI", 0.33, 0.33, 0.34),
        Framework::new("SASB", 0.30, 0.35, 0.35),
        Framework::new("TCFD", 0.50, 0.20, 0.30),
        Framework::new("CDP", 0.60, 0.15, 0.25),
    ]
}

/// Case-insensitive lookup of a built-in framework
pub fn framework_by_name(name: &str) -> Option<Framework> {
    builtin_frameworks()
        .into_iter()
        .find(|f| f.name.eq_ignore_ascii_case(name.trim()))
}

pub fn framework_description(name: &str) -> &'static str {
    match name.to_ascii_uppercase().as_str() {
        "GRI" => "Global Reporting Initiative",
        "SASB" => "Sustainability Accounting Standards Board",
        "TCFD" => "Task Force on Climate-related Financial Disclosures",
        "CDP" => "Carbon Disclosure Project",
        _ => "Custom weighting",
    }
}

/// Topics considered most material for an industry, per pillar
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct MaterialityMap {
    pub industry: Industry,
    pub environmental: Vec<&'static str>,
    pub social: Vec<&'static str>,
    pub governance: Vec<&'static str>,
}

/// `None` for `Industry::Other`
pub fn industry_materiality(industry: Industry) -> Option<MaterialityMap> {
    let (environmental, social, governance) = match industry {
        Industry::Technology => (
            vec!["Energy Management", "E-Waste", "Data Center Efficiency", "Product Lifecycle", "Carbon Footprint"],
            vec!["Data Privacy", "Labor Practices", "Diversity & Inclusion", "Supply Chain Labor", "Employee Wellbeing"],
            vec!["Data Security", "Business Ethics", "Board Diversity", "Regulatory Compliance", "IP Protection"],
        ),
        Industry::Energy => (
            vec!["GHG Emissions", "Water Management", "Biodiversity", "Waste Management", "Renewable Energy"],
            vec!["Community Relations", "Health & Safety", "Indigenous Rights", "Fair Labor", "Energy Access"],
            vec!["Climate Risk Disclosure", "Lobbying Transparency", "Executive Compensation", "Board Independence", "Compliance"],
        ),
        Industry::Finance => (
            vec!["Financed Emissions", "Green Lending", "Climate Risk", "Sustainable Investment", "Operational Footprint"],
            vec!["Financial Inclusion", "Customer Privacy", "Fair Lending", "Community Development", "Employee Diversity"],
            vec!["Risk Management", "Anti-Money Laundering", "Regulatory Compliance", "Shareholder Rights", "Executive Pay"],
        ),
        Industry::Manufacturing => (
            vec!["Air Quality", "Water Usage", "Hazardous Waste", "Resource Efficiency", "Circular Economy"],
            vec!["Worker Safety", "Fair Wages", "Supply Chain Practices", "Product Quality", "Community Impact"],
            vec!["Supply Chain Oversight", "Quality Control", "Compliance", "Stakeholder Engagement", "Transparency"],
        ),
        Industry::Retail => (
            vec!["Sustainable Sourcing", "Packaging Waste", "Energy in Stores", "Transportation", "Product Lifecycle"],
            vec!["Labor Rights", "Product Safety", "Community Impact", "Diversity", "Customer Wellbeing"],
            vec!["Supply Chain Transparency", "Consumer Protection", "Data Privacy", "Business Ethics", "Board Composition"],
        ),
        Industry::Other => return None,
    };

    Some(MaterialityMap {
        industry,
        environmental,
        social,
        governance,
    })
}

/// Quarterly growth rates for the three pillars
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GrowthRates {
    pub e: f64,
    pub s: f64,
    pub g: f64,
}

pub const DEFAULT_GROWTH_RATES: GrowthRates = GrowthRates { e: 0.005, s: 0.005, g: 0.005 };

const GROWTH_TABLE: &[(&str, GrowthRates)] = &[
    ("TSLA", GrowthRates { e: 0.008, s: 0.006, g: 0.005 }),
    ("AAPL", GrowthRates { e: 0.006, s: 0.007, g: 0.006 }),
    ("GOOGL", GrowthRates { e: 0.007, s: 0.006, g: 0.007 }),
    ("MSFT", GrowthRates { e: 0.006, s: 0.008, g: 0.006 }),
    ("NVDA", GrowthRates { e: 0.009, s: 0.005, g: 0.006 }),
    ("META", GrowthRates { e: 0.005, s: 0.008, g: 0.005 }),
    ("AMZN", GrowthRates { e: 0.007, s: 0.006, g: 0.005 }),
    ("NFLX", GrowthRates { e: 0.006, s: 0.006, g: 0.006 }),
    ("INTC", GrowthRates { e: 0.007, s: 0.005, g: 0.006 }),
    ("AMD", GrowthRates { e: 0.008, s: 0.006, g: 0.005 }),
];

/// Unknown tickers get `DEFAULT_GROWTH_RATES`
pub fn growth_rates_for(ticker: &str) -> GrowthRates {
    let ticker = ticker.trim();
    GROWTH_TABLE
        .iter()
        .find(|(t, _)| t.eq_ignore_ascii_case(ticker))
        .map(|(_, rates)| *rates)
        .unwrap_or(DEFAULT_GROWTH_RATES)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_frameworks_sum_to_one() {
        for fw in builtin_frameworks() {
            assert!((fw.weights.sum() - 1.0).abs() < 1e-9, "{} sums to {}", fw.name, fw.weights.sum());
            assert!(fw.validate().is_ok());
        }
    }

    #[test]
    fn test_framework_lookup_case_insensitive() {
        let tcfd = framework_by_name("tcfd").unwrap();
        assert_eq!(tcfd.weights.e, 0.50);
        assert!(framework_by_name("ISSB").is_none());
    }

    #[test]
    fn test_materiality_tables() {
        for industry in Industry::KNOWN {
            let map = industry_materiality(industry).unwrap();
            assert_eq!(map.environmental.len(), 5);
            assert_eq!(map.social.len(), 5);
            assert_eq!(map.governance.len(), 5);
        }
        assert!(industry_materiality(Industry::Other).is_none());
    }

    #[test]
    fn test_growth_rates_lookup() {
        assert_eq!(growth_rates_for("nvda").e, 0.009);
        assert_eq!(growth_rates_for("ZZZZ"), DEFAULT_GROWTH_RATES);
    }
}
