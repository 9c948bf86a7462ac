use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{DispatchError, PointError};
use crate::types::{Policy, MIN_POINTS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NavType {
    Driving,
    Riding,
    Walking,
}

impl NavType {
    pub const ALL: [NavType; 3] = [NavType::Driving, NavType::Riding, NavType::Walking];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Driving => "driving",
            Self::Riding => "riding",
            Self::Walking => "walking",
        }
    }

    /// Only driving routes honour the routing policy; the others carry it along untouched.
    pub fn uses_policy(&self) -> bool {
        matches!(self, Self::Driving)
    }
}

impl std::default::Default for NavType {
    fn default() -> Self {
        Self::Driving
    }
}

impl FromStr for NavType {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NavType::ALL
            .iter()
            .find(|nav_type| nav_type.as_str() == s)
            .copied()
            .ok_or_else(|| DispatchError::InvalidNavType(s.to_owned()))
    }
}

impl fmt::Display for NavType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A route waypoint, either an exact position or a place name the map provider resolves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "WirePoint", try_from = "WirePoint")]
pub enum NavigationPoint {
    Coordinates { lng: f64, lat: f64 },
    Keyword { keyword: String, city: String },
}

impl NavigationPoint {
    pub fn coordinates(lng: f64, lat: f64) -> Self {
        Self::Coordinates { lng, lat }
    }

    pub fn keyword(keyword: impl Into<String>, city: impl Into<String>) -> Self {
        Self::Keyword {
            keyword: keyword.into(),
            city: city.into(),
        }
    }

    /// Normalizes one untyped point as handed over by a tool call.
    pub fn from_raw(raw: &Value) -> Result<Self, PointError> {
        if !raw.is_object() {
            return Err(PointError::InvalidShape(format!(
                "expected an object, got {}",
                raw
            )));
        }
        let wire =
            WirePoint::deserialize(raw).map_err(|err| PointError::InvalidShape(err.to_string()))?;
        Self::try_from(wire)
    }
}

impl fmt::Display for NavigationPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Coordinates { lng, lat } => write!(f, "({}, {})", lng, lat),
            Self::Keyword { keyword, city } => write!(f, "{} ({})", keyword, city),
        }
    }
}

/// Flat shape the viewer script reads: all four keys, the unused pair left null.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct WirePoint {
    lng: Option<f64>,
    lat: Option<f64>,
    keyword: Option<String>,
    city: Option<String>,
}

impl From<NavigationPoint> for WirePoint {
    fn from(point: NavigationPoint) -> Self {
        match point {
            NavigationPoint::Coordinates { lng, lat } => WirePoint {
                lng: Some(lng),
                lat: Some(lat),
                ..Default::default()
            },
            NavigationPoint::Keyword { keyword, city } => WirePoint {
                keyword: Some(keyword),
                city: Some(city),
                ..Default::default()
            },
        }
    }
}

impl TryFrom<WirePoint> for NavigationPoint {
    type Error = PointError;

    fn try_from(wire: WirePoint) -> Result<Self, Self::Error> {
        // A keyword without its city is rejected even when coordinates are present.
        if wire.keyword.is_some() && wire.city.is_none() {
            return Err(PointError::MissingCity);
        }
        match wire {
            WirePoint {
                lng: Some(lng),
                lat: Some(lat),
                ..
            } => Ok(NavigationPoint::Coordinates { lng, lat }),
            WirePoint {
                keyword: Some(keyword),
                city: Some(city),
                ..
            } => Ok(NavigationPoint::Keyword { keyword, city }),
            _ => Err(PointError::MissingLocation),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NavigationCommand {
    points: Vec<NavigationPoint>,
    policy: Policy,
    nav_type: NavType,
}

impl NavigationCommand {
    pub fn new(
        points: Vec<NavigationPoint>,
        policy: Policy,
        nav_type: NavType,
    ) -> Result<Self, DispatchError> {
        if points.len() < MIN_POINTS {
            return Err(DispatchError::TooFewPoints(points.len()));
        }
        Ok(Self {
            points,
            policy,
            nav_type,
        })
    }

    pub fn points(&self) -> &[NavigationPoint] {
        &self.points
    }

    pub fn policy(&self) -> Policy {
        self.policy
    }

    pub fn nav_type(&self) -> NavType {
        self.nav_type
    }

    /// One line per point, then mode and policy.
    pub fn describe(&self) -> String {
        let mut lines: Vec<String> = vec![format!("Mode: {}", self.nav_type)];
        lines.extend(
            self.points
                .iter()
                .enumerate()
                .map(|(i, point)| format!("Point {}: {}", i + 1, point)),
        );
        if self.nav_type.uses_policy() {
            lines.push(format!("Policy: {}", self.policy));
        } else {
            lines.push(format!(
                "Policy: {} (not used by {} routes)",
                self.policy, self.nav_type
            ));
        }
        lines.join("\n")
    }
}

/// Frames pushed from the server to a viewer.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage<'a> {
    Navigation { command: &'a NavigationCommand },
}
