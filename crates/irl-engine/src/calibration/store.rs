use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::components::color_range::ColorRange;
use crate::core::roster::Roster;
use crate::error::{IrlError, Result};

/// Calibration file layout: `{ "balls": [ { "<name>": { "hMin": .. } }, .. ] }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CalibrationFile<R> {
    balls: Vec<HashMap<String, R>>,
}

/// A bound as stored on disk: written as an integer, but older files hold
/// decimal strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum StoredBound {
    Int(i64),
    Text(String),
}

impl StoredBound {
    fn value(&self, ball: &str, label: &str) -> Result<i64> {
        match self {
            StoredBound::Int(v) => Ok(*v),
            StoredBound::Text(s) => s.trim().parse().map_err(|_| IrlError::InvalidColorRange {
                ball: ball.to_string(),
                reason: format!("{} = {:?} is not an integer", label, s),
            }),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredRange {
    h_min: StoredBound,
    h_max: StoredBound,
    s_min: StoredBound,
    s_max: StoredBound,
    v_min: StoredBound,
    v_max: StoredBound,
}

impl StoredRange {
    fn resolve(&self, ball: &str) -> Result<ColorRange> {
        let bounds = [
            self.h_min.value(ball, "hMin")?,
            self.h_max.value(ball, "hMax")?,
            self.s_min.value(ball, "sMin")?,
            self.s_max.value(ball, "sMax")?,
            self.v_min.value(ball, "vMin")?,
            self.v_max.value(ball, "vMax")?,
        ];
        ColorRange::from_bounds(ball, bounds)
    }
}

/// Per-ball colour windows, kept in roster order.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationStore {
    entries: Vec<(String, ColorRange)>,
}

impl CalibrationStore {
    /// Every ball gets the window that selects all pixels.
    pub fn defaults(roster: &Roster) -> Self {
        Self {
            entries: roster
                .names()
                .map(|name| (name.to_string(), ColorRange::full()))
                .collect(),
        }
    }

    /// Parse a calibration document. Entries are matched by name; every
    /// roster ball must be present. Unknown names are ignored.
    pub fn from_json(json: &str, roster: &Roster) -> Result<Self> {
        let file: CalibrationFile<StoredRange> = serde_json::from_str(json)?;
        let mut by_name: HashMap<&str, &StoredRange> = HashMap::new();
        for entry in &file.balls {
            for (name, range) in entry {
                by_name.entry(name.as_str()).or_insert(range);
            }
        }

        let entries = roster
            .names()
            .map(|name| {
                let stored = by_name
                    .get(name)
                    .ok_or_else(|| IrlError::MissingBall(name.to_string()))?;
                Ok((name.to_string(), stored.resolve(name)?))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { entries })
    }

    /// Serialize with integer bounds, one single-key object per ball.
    pub fn to_json(&self) -> Result<String> {
        let file = CalibrationFile {
            balls: self
                .entries
                .iter()
                .map(|(name, range)| HashMap::from([(name.clone(), *range)]))
                .collect(),
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }

    pub fn load(path: &Path, roster: &Roster) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| IrlError::io(path, e))?;
        let store = Self::from_json(&json, roster)?;
        log::info!("Loaded calibration for {} balls from {}", store.len(), path.display());
        Ok(store)
    }

    /// Load `path`, first writing a default file there if none exists.
    pub fn load_or_create(path: &Path, roster: &Roster) -> Result<Self> {
        if !path.exists() {
            log::warn!("No calibration at {}, writing defaults", path.display());
            Self::defaults(roster).save(path)?;
        }
        Self::load(path, roster)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = self.to_json()?;
        std::fs::write(path, json).map_err(|e| IrlError::io(path, e))?;
        log::info!("Saved calibration to {}", path.display());
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<ColorRange> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, range)| *range)
    }

    /// Replace one ball's window after validating it.
    pub fn set_range(&mut self, name: &str, range: ColorRange) -> Result<()> {
        range.validate(name)?;
        let slot = self
            .entries
            .iter_mut()
            .find(|(n, _)| n == name)
            .ok_or_else(|| IrlError::UnknownBall(name.to_string()))?;
        slot.1 = range;
        Ok(())
    }

    /// Copy every window onto the matching roster ball.
    pub fn apply_to(&self, roster: &mut Roster) {
        for (name, range) in &self.entries {
            if let Some(ball) = roster.find_mut(name) {
                ball.range = *range;
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ColorRange)> {
        self.entries.iter().map(|(n, r)| (n.as_str(), r))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CalibrationStore {
        let roster = Roster::default();
        let mut store = CalibrationStore::defaults(&roster);
        store
            .set_range("Yellow", ColorRange::new((20, 35), (100, 255), (120, 255)))
            .unwrap();
        store
            .set_range("Blue", ColorRange::new((100, 125), (80, 255), (40, 200)))
            .unwrap();
        store
            .set_range("Green", ColorRange::new((45, 80), (60, 250), (30, 240)))
            .unwrap();
        store
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.txt");
        let roster = Roster::default();

        let store = sample();
        store.save(&path).unwrap();
        let loaded = CalibrationStore::load(&path, &roster).unwrap();
        assert_eq!(loaded, store);
        for (name, range) in store.iter() {
            assert_eq!(loaded.get(name).unwrap().bounds(), range.bounds(), "{}", name);
        }
    }

    #[test]
    fn saved_bounds_are_integers() {
        let json = sample().to_json().unwrap();
        assert!(json.contains("\"hMin\": 20"), "{}", json);
        assert!(!json.contains("\"hMin\": \"20\""));
    }

    #[test]
    fn parses_string_bounds() {
        let roster = Roster::new([("Red", [255, 0, 0])]);
        let json = r#"{ "balls": [ { "Red": {
            "hMin": "0", "hMax": "10", "sMin": "100",
            "sMax": "255", "vMin": "50", "vMax": "255" } } ] }"#;
        let store = CalibrationStore::from_json(json, &roster).unwrap();
        assert_eq!(
            store.get("Red").unwrap(),
            ColorRange::new((0, 10), (100, 255), (50, 255))
        );
    }

    #[test]
    fn entries_match_by_name_not_position() {
        let roster = Roster::new([("A", [0, 0, 0]), ("B", [0, 0, 0])]);
        let json = r#"{ "balls": [
            { "B": { "hMin": 5, "hMax": 6, "sMin": 0, "sMax": 255, "vMin": 0, "vMax": 255 } },
            { "A": { "hMin": 1, "hMax": 2, "sMin": 0, "sMax": 255, "vMin": 0, "vMax": 255 } }
        ] }"#;
        let store = CalibrationStore::from_json(json, &roster).unwrap();
        assert_eq!(store.get("A").unwrap().h_min, 1);
        assert_eq!(store.get("B").unwrap().h_min, 5);
        let names: Vec<&str> = store.iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["A", "B"]);
    }

    #[test]
    fn missing_ball_is_an_error() {
        let roster = Roster::new([("A", [0, 0, 0]), ("B", [0, 0, 0])]);
        let json = r#"{ "balls": [
            { "A": { "hMin": 1, "hMax": 2, "sMin": 0, "sMax": 255, "vMin": 0, "vMax": 255 } }
        ] }"#;
        let err = CalibrationStore::from_json(json, &roster).unwrap_err();
        assert!(matches!(err, IrlError::MissingBall(ref n) if n == "B"));
    }

    #[test]
    fn out_of_range_bound_is_rejected() {
        let roster = Roster::new([("A", [0, 0, 0])]);
        let json = r#"{ "balls": [
            { "A": { "hMin": 0, "hMax": 200, "sMin": 0, "sMax": 255, "vMin": 0, "vMax": 255 } }
        ] }"#;
        assert!(matches!(
            CalibrationStore::from_json(json, &roster),
            Err(IrlError::InvalidColorRange { .. })
        ));
    }

    #[test]
    fn load_or_create_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calibration.json");
        let roster = Roster::default();

        let store = CalibrationStore::load_or_create(&path, &roster).unwrap();
        assert!(path.exists());
        assert_eq!(store, CalibrationStore::defaults(&roster));
        assert_eq!(store.len(), 6);
    }

    #[test]
    fn load_missing_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        let err = CalibrationStore::load(&path, &Roster::default()).unwrap_err();
        assert!(matches!(err, IrlError::Io { .. }));
        assert!(err.to_string().contains("absent.json"));
    }

    #[test]
    fn set_range_unknown_ball() {
        let mut store = sample();
        assert!(matches!(
            store.set_range("Cue", ColorRange::full()),
            Err(IrlError::UnknownBall(_))
        ));
    }

    #[test]
    fn apply_to_roster() {
        let mut roster = Roster::default();
        sample().apply_to(&mut roster);
        assert_eq!(roster.find("Yellow").unwrap().range.h_min, 20);
        assert_eq!(roster.find("Red").unwrap().range, ColorRange::full());
    }
}
