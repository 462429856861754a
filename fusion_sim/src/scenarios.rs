//! Tracking scenarios.

use nalgebra::Vector2;

use crate::oracle::Trajectory;

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioId {
    /// Constant-velocity target moving away from the sensors
    Straight,

    /// Target circling the sensors; the bearing crosses ±π every lap
    Circle,

    /// Straight pass across the negative x axis, where the bearing jumps
    CrossBearingSeam,

    /// Straight pass two meters from the radar
    CloseApproach,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::Straight,
            ScenarioId::Circle,
            ScenarioId::CrossBearingSeam,
            ScenarioId::CloseApproach,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::Straight => "straight",
            ScenarioId::Circle => "circle",
            ScenarioId::CrossBearingSeam => "cross_bearing_seam",
            ScenarioId::CloseApproach => "close_approach",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::Straight => "3.2 m/s straight line from (5, 2), moving away",
            ScenarioId::Circle => "10 m radius circle at 5 m/s around the sensor origin",
            ScenarioId::CrossBearingSeam => "diagonal pass crossing the negative x axis at x = -15",
            ScenarioId::CloseApproach => "pass along y = 2 through the sensor's near field",
        }
    }

    /// Ground truth motion for this scenario.
    pub fn trajectory(&self) -> Trajectory {
        match self {
            ScenarioId::Straight => Trajectory::Straight {
                start: Vector2::new(5.0, 2.0),
                velocity: Vector2::new(3.0, 1.0),
            },
            ScenarioId::Circle => Trajectory::Circle {
                center: Vector2::zeros(),
                radius: 10.0,
                angular_rate: 0.5,
                phase: 0.0,
            },
            ScenarioId::CrossBearingSeam => Trajectory::Straight {
                start: Vector2::new(-20.0, 5.0),
                velocity: Vector2::new(1.0, -1.0),
            },
            ScenarioId::CloseApproach => Trajectory::Straight {
                start: Vector2::new(-20.0, 2.0),
                velocity: Vector2::new(2.0, 0.0),
            },
        }
    }

    /// Pass thresholds: (position RMSE in m, velocity RMSE in m/s).
    pub fn thresholds(&self) -> (f64, f64) {
        match self {
            ScenarioId::Straight | ScenarioId::CrossBearingSeam => (0.5, 1.5),
            ScenarioId::Circle | ScenarioId::CloseApproach => (0.6, 2.0),
        }
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "straight" => Ok(ScenarioId::Straight),
            "circle" => Ok(ScenarioId::Circle),
            "cross_bearing_seam" | "seam" => Ok(ScenarioId::CrossBearingSeam),
            "close_approach" | "close" => Ok(ScenarioId::CloseApproach),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for scenario in ScenarioId::all() {
            assert_eq!(scenario.name().parse::<ScenarioId>(), Ok(scenario));
        }
        assert!("time_warp".parse::<ScenarioId>().is_err());
    }

    #[test]
    fn test_seam_scenario_crosses_negative_x_axis() {
        let trajectory = ScenarioId::CrossBearingSeam.trajectory();
        let before = trajectory.state_at(4.0);
        let after = trajectory.state_at(6.0);
        assert!(before[0] < 0.0 && before[1] > 0.0);
        assert!(after[0] < 0.0 && after[1] < 0.0);
    }
}
