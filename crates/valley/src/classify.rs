//! Valley type decision table
//!
//! Stateless per segment: slope class picks the energy regime, the coupling
//! statistic and the valley/bankfull width ratio split it, then the
//! Canyon, Gorge and Glacial overrides are tried in that order, first match
//! wins.

use crate::hillslope::Steepness;

/// Final valley type of a segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValleyType {
    HighEnergyCoupled,
    HighEnergyOpen,
    ModerateEnergyConfined,
    MediumEnergyOpen,
    Canyon,
    Gorge,
    Glacial,
    LowEnergyFloodplain,
    Unclassified,
}

impl ValleyType {
    pub const ALL: [ValleyType; 9] = [
        ValleyType::HighEnergyCoupled,
        ValleyType::HighEnergyOpen,
        ValleyType::ModerateEnergyConfined,
        ValleyType::MediumEnergyOpen,
        ValleyType::Canyon,
        ValleyType::Gorge,
        ValleyType::Glacial,
        ValleyType::LowEnergyFloodplain,
        ValleyType::Unclassified,
    ];

    /// Numeric class written to the `Val_Class` attribute
    pub fn code(self) -> i64 {
        match self {
            ValleyType::Unclassified => 0,
            ValleyType::HighEnergyCoupled => 1,
            ValleyType::HighEnergyOpen => 2,
            ValleyType::ModerateEnergyConfined => 3,
            ValleyType::MediumEnergyOpen => 4,
            ValleyType::Canyon => 5,
            ValleyType::Gorge => 6,
            ValleyType::Glacial => 7,
            ValleyType::LowEnergyFloodplain => 8,
        }
    }

    pub fn abbreviation(self) -> &'static str {
        match self {
            ValleyType::HighEnergyCoupled => "HEC",
            ValleyType::HighEnergyOpen => "HEO",
            ValleyType::ModerateEnergyConfined => "MEC",
            ValleyType::MediumEnergyOpen => "MEO",
            ValleyType::Canyon => "CAN",
            ValleyType::Gorge => "GOR",
            ValleyType::Glacial => "GLA",
            ValleyType::LowEnergyFloodplain => "LEF",
            ValleyType::Unclassified => "UNC",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ValleyType::HighEnergyCoupled => "High-Energy-Coupled",
            ValleyType::HighEnergyOpen => "High-Energy-Open",
            ValleyType::ModerateEnergyConfined => "Moderate-Energy-Confined",
            ValleyType::MediumEnergyOpen => "Medium-Energy-Open",
            ValleyType::Canyon => "Canyon",
            ValleyType::Gorge => "Gorge",
            ValleyType::Glacial => "Glacial-influenced",
            ValleyType::LowEnergyFloodplain => "Low-Energy-Floodplain",
            ValleyType::Unclassified => "Unclassified",
        }
    }
}

impl std::fmt::Display for ValleyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Decision thresholds
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifyParams {
    /// Debris runout length contributed by each coupled hillslope
    pub debris_runout: f64,
    /// Coupling statistic at or above which a high-gradient valley is coupled
    pub coupling_threshold: f64,
    /// Width ratio at or below which a moderate-gradient valley is confined
    pub confined_ratio: f64,
    /// Width ratio below which a steep-walled valley is a canyon
    pub canyon_ratio: f64,
    pub glacial_min_width: f64,
    pub glacial_min_elev: f64,
}

impl Default for ClassifyParams {
    fn default() -> Self {
        Self {
            debris_runout: 15.0,
            coupling_threshold: 0.75,
            confined_ratio: 7.0,
            canyon_ratio: 3.0,
            glacial_min_width: 100.0,
            glacial_min_elev: 2500.0,
        }
    }
}

/// Per-segment facts the decision table reads
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassifyInputs {
    pub slope_class: i64,
    /// Hydro-geomorphic valley width
    pub valley_width: f64,
    pub bankfull_width: f64,
    /// Lowest elevation on the stream course
    pub min_elev: f64,
    pub right: Option<Steepness>,
    pub left: Option<Steepness>,
}

impl ClassifyInputs {
    /// Side categories with a missing side mirroring the present one.
    ///
    /// Only the coupling statistic assumes symmetric banks; the Canyon and
    /// Gorge overrides read the sides as found.
    pub fn effective_sides(&self) -> (Option<Steepness>, Option<Steepness>) {
        (self.right.or(self.left), self.left.or(self.right))
    }

    pub fn width_ratio(&self) -> f64 {
        if self.bankfull_width > 0.0 {
            self.valley_width / self.bankfull_width
        } else {
            f64::INFINITY
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub valley_type: ValleyType,
    pub width_ratio: f64,
    pub coupling: f64,
}

/// Debris delivery of the steep sides relative to the overbank width
pub fn coupling_statistic(
    contributing_sides: usize,
    debris_runout: f64,
    valley_width: f64,
    bankfull_width: f64,
) -> f64 {
    let numerator = contributing_sides as f64 * debris_runout;
    let overbank = valley_width - bankfull_width;
    if overbank > 0.0 {
        numerator / overbank
    } else if contributing_sides > 0 {
        f64::INFINITY
    } else {
        0.0
    }
}

pub fn classify(inputs: &ClassifyInputs, params: &ClassifyParams) -> Classification {
    let width_ratio = inputs.width_ratio();
    let (right, left) = inputs.effective_sides();

    let contributing = [right, left]
        .iter()
        .filter(|s| matches!(s, Some(c) if *c != Steepness::Low))
        .count();
    let coupling = coupling_statistic(
        contributing,
        params.debris_runout,
        inputs.valley_width,
        inputs.bankfull_width,
    );

    let base = match inputs.slope_class {
        3 if coupling >= params.coupling_threshold => ValleyType::HighEnergyCoupled,
        3 => ValleyType::HighEnergyOpen,
        2 if width_ratio <= params.confined_ratio => ValleyType::ModerateEnergyConfined,
        2 => ValleyType::MediumEnergyOpen,
        1 => ValleyType::LowEnergyFloodplain,
        _ => {
            return Classification {
                valley_type: ValleyType::Unclassified,
                width_ratio,
                coupling,
            }
        }
    };

    let both_steep =
        inputs.right == Some(Steepness::High) && inputs.left == Some(Steepness::High);
    let valley_type = if both_steep && width_ratio < params.canyon_ratio {
        ValleyType::Canyon
    } else if both_steep {
        ValleyType::Gorge
    } else if inputs.slope_class < 3
        && inputs.valley_width >= params.glacial_min_width
        && inputs.min_elev > params.glacial_min_elev
    {
        ValleyType::Glacial
    } else {
        base
    };

    Classification {
        valley_type,
        width_ratio,
        coupling,
    }
}
