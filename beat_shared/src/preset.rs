use lazy_static::lazy_static;
use serde::Serialize;

use crate::kit::Kit;
use crate::pattern::PatternData;

/// A named starting point: tempo, kit and a full pattern.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Preset {
    pub id: &'static str,
    pub name: &'static str,
    pub category: &'static str,
    pub bpm: f32,
    pub kit: Kit,
    pub description: &'static str,
    pub pattern: PatternData,
}

// Lanes are written one character per step, 'x' for a hit.
fn hits(lane: &str) -> Vec<bool> {
    lane.chars().map(|c| c == 'x').collect()
}

const FOUR_ON_THE_FLOOR: &str = "x...x...x...x...";
const BACKBEAT: &str = "....x.......x...";
const HATS_8TH: &str = "x.x.x.x.x.x.x.x.";
const HATS_16TH: &str = "xxxxxxxxxxxxxxxx";
const OFFBEAT_HATS: &str = "..x...x...x...x.";
const SILENT: &str = "................";

#[allow(clippy::too_many_arguments)]
fn preset(
    id: &'static str,
    name: &'static str,
    category: &'static str,
    bpm: f32,
    kit: Kit,
    description: &'static str,
    lanes: [&str; 3],
    synth: [f32; 16],
) -> Preset {
    let [kick, snare, hihat] = lanes;
    Preset {
        id,
        name,
        category,
        bpm,
        kit,
        description,
        pattern: PatternData {
            kick: hits(kick),
            snare: hits(snare),
            hihat: hits(hihat),
            synth: synth.to_vec(),
        },
    }
}

lazy_static! {
    pub static ref PRESETS: Vec<Preset> = vec![
        preset(
            "drift-phonk-cowbell", "Drift Phonk Cowbell", "Phonk", 160.0, Kit::Phonk,
            "High speed, aggressive cowbell melody.",
            ["x...x...x..x....", BACKBEAT, HATS_8TH],
            [622.0, 622.0, 622.0, 0.0, 523.0, 0.0, 622.0, 0.0, 698.0, 698.0, 0.0, 0.0, 523.0, 0.0, 0.0, 0.0],
        ),
        preset(
            "murder-phonk-dark", "Murder Phonk Dark", "Phonk", 145.0, Kit::Phonk,
            "Distorted 808s and sinister vibes.",
            ["x..x..x.x..x....", "....x.......x.x.", HATS_16TH],
            [523.0, 0.0, 0.0, 523.0, 0.0, 0.0, 587.0, 0.0, 523.0, 0.0, 0.0, 466.0, 0.0, 0.0, 0.0, 0.0],
        ),
        preset(
            "chill-phonk-lofi", "Chill Phonk Lofi", "Phonk", 120.0, Kit::Phonk,
            "Slower, jazzier cowbell chops.",
            ["x.......x...x...", BACKBEAT, "x.xxx.x.x.xxx.x."],
            [880.0, 0.0, 0.0, 783.0, 0.0, 0.0, 698.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 783.0, 0.0],
        ),
        preset(
            "memphis-doom", "Memphis Doom", "Phonk", 135.0, Kit::Phonk,
            "Heavy 808s with relentless hi-hats.",
            ["x..xx...x..xx..x", BACKBEAT, "xxx.xxx.xxx.xxx."],
            [523.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 523.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
        ),
        preset(
            "sahara-drift", "Sahara Drift", "Phonk", 170.0, Kit::Phonk,
            "Extreme speed drift phonk.",
            ["x.x...x.x.x...x.", BACKBEAT, HATS_8TH],
            [1046.0, 0.0, 880.0, 0.0, 783.0, 0.0, 698.0, 0.0, 783.0, 0.0, 880.0, 0.0, 1046.0, 0.0, 0.0, 0.0],
        ),
        preset(
            "wedding-party-entrance", "Wedding Party Entrance", "Events", 105.0, Kit::Afro,
            "Joyful, bouncy Afro-pop for celebrations.",
            ["x..x..x.x..x..x.", "...x..x....x..x.", HATS_16TH],
            [523.0, 0.0, 587.0, 0.0, 659.0, 0.0, 587.0, 0.0, 523.0, 0.0, 0.0, 0.0, 523.0, 587.0, 659.0, 0.0],
        ),
        preset(
            "birthday-jazz-swing", "Birthday Jazz Swing", "Events", 124.0, Kit::Standard,
            "Upbeat swing rhythm for happy vibes.",
            ["x.......x.......", BACKBEAT, "x.xxx.x.x.xxx.x."],
            [523.0, 0.0, 0.0, 440.0, 0.0, 0.0, 392.0, 0.0, 349.0, 0.0, 329.0, 0.0, 0.0, 0.0, 523.0, 0.0],
        ),
        preset(
            "birthday-trap-remix", "Birthday Trap Remix", "Events", 140.0, Kit::Trap,
            "Hype birthday song style beat.",
            ["x.....x...x.....", "....x.......x.x.", HATS_16TH],
            [523.0, 0.0, 523.0, 0.0, 587.0, 0.0, 523.0, 0.0, 698.0, 0.0, 659.0, 0.0, 0.0, 0.0, 0.0, 0.0],
        ),
        preset(
            "tech-event-intro", "Tech Event Intro", "Events", 124.0, Kit::Electronic,
            "Futuristic, driving, clean energy.",
            [FOUR_ON_THE_FLOOR, BACKBEAT, OFFBEAT_HATS],
            [261.0, 261.0, 0.0, 261.0, 261.0, 0.0, 261.0, 0.0, 392.0, 0.0, 0.0, 0.0, 392.0, 0.0, 0.0, 0.0],
        ),
        preset(
            "tech-reveal-swell", "Tech Product Reveal", "Events", 110.0, Kit::Electronic,
            "Suspenseful build up for announcements.",
            ["x.......x.......", "............x...", "x...x...x.x.xxxx"],
            [130.0, 0.0, 130.0, 0.0, 130.0, 0.0, 130.0, 0.0, 261.0, 261.0, 261.0, 261.0, 523.0, 523.0, 523.0, 523.0],
        ),
        preset(
            "horror-spine-chiller", "Horror Spine Chiller", "Cinematic", 70.0, Kit::Trap,
            "Scary, dissonant, sparse tension.",
            ["x.........x.....", "............x...", "x..x..x.....x..."],
            [261.0, 0.0, 0.0, 311.0, 0.0, 0.0, 0.0, 0.0, 370.0, 0.0, 0.0, 0.0, 261.0, 0.0, 311.0, 0.0],
        ),
        preset(
            "horror-chase-scene", "Horror Chase Scene", "Cinematic", 160.0, Kit::Trap,
            "Fast, frantic, anxiety inducing.",
            [HATS_8TH, OFFBEAT_HATS, HATS_16TH],
            [600.0, 0.0, 0.0, 580.0, 0.0, 0.0, 560.0, 0.0, 600.0, 0.0, 0.0, 580.0, 0.0, 0.0, 560.0, 0.0],
        ),
        preset(
            "amapiano-deep-log", "Amapiano Deep Log", "Amapiano", 112.0, Kit::Amapiano,
            "Swing-heavy, off-beat emphasis.",
            ["x...x..x..x.x...", OFFBEAT_HATS, HATS_16TH],
            [0.0, 80.0, 0.0, 0.0, 110.0, 0.0, 80.0, 0.0, 0.0, 98.0, 0.0, 0.0, 73.0, 0.0, 0.0, 0.0],
        ),
        preset(
            "amapiano-club", "Amapiano Club", "Amapiano", 114.0, Kit::Amapiano,
            "Strong groove, punchy kick.",
            [FOUR_ON_THE_FLOOR, "...x...x...x.x.x", "x.xxx.xxx.xxx.xx"],
            [110.0, 0.0, 110.0, 0.0, 98.0, 0.0, 0.0, 123.0, 0.0, 110.0, 0.0, 98.0, 0.0, 87.0, 87.0, 0.0],
        ),
        preset(
            "afrobeats-classic", "Afrobeats Classic", "Afro", 100.0, Kit::Afro,
            "Bounce groove, syncopated.",
            ["x..x..x.x..x..x.", OFFBEAT_HATS, "xx.xxx.xxx.xxx.x"],
            [440.0, 0.0, 0.0, 523.0, 0.0, 0.0, 392.0, 0.0, 440.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
        ),
        preset(
            "afro-pop-bright", "Afro Pop Bright", "Afro", 105.0, Kit::Afro,
            "Clean, straight groove.",
            [FOUR_ON_THE_FLOOR, "...x..x....x..x.", HATS_16TH],
            [523.0, 0.0, 0.0, 587.0, 0.0, 523.0, 0.0, 0.0, 659.0, 0.0, 0.0, 587.0, 0.0, 0.0, 523.0, 0.0],
        ),
        preset(
            "afro-fusion-global", "Afro Fusion", "Afro", 98.0, Kit::Afro,
            "Hybrid African + western.",
            ["x.x...x.x.x...x.", BACKBEAT, "x.x.xxx.x.x.xxx."],
            [392.0, 0.0, 440.0, 0.0, 0.0, 0.0, 329.0, 0.0, 0.0, 0.0, 392.0, 0.0, 0.0, 0.0, 0.0, 0.0],
        ),
        preset(
            "afro-soul-warm", "Afro Soul Warm", "Afro", 90.0, Kit::Afro,
            "Loose, emotional.",
            [FOUR_ON_THE_FLOOR, BACKBEAT, HATS_8TH],
            [261.0, 0.0, 329.0, 0.0, 392.0, 0.0, 0.0, 0.0, 261.0, 0.0, 329.0, 0.0, 392.0, 0.0, 0.0, 0.0],
        ),
        preset(
            "afro-drill-dark", "Afro Drill Dark", "Hip-Hop", 142.0, Kit::Trap,
            "Aggressive, sliding patterns.",
            ["x.......x..x....", BACKBEAT, "x.xxx.x.xxx.x.x."],
            [0.0, 0.0, 150.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 150.0, 0.0, 0.0, 0.0, 140.0, 0.0],
        ),
        preset(
            "trap-afro-fusion", "Trap Afro Fusion", "Hip-Hop", 135.0, Kit::Trap,
            "Trap bounce + Afro swing.",
            ["x...x...x.x.....", "....x.......x..x", HATS_16TH],
            [300.0, 0.0, 0.0, 0.0, 0.0, 0.0, 280.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 260.0, 0.0],
        ),
        preset(
            "rnb-afro-chill", "R&B Afro Chill", "R&B", 88.0, Kit::Standard,
            "Slow, laid-back.",
            ["x.......x.......", BACKBEAT, "x.x.x.x.x.x.x.xx"],
            [261.0, 261.0, 0.0, 0.0, 293.0, 293.0, 0.0, 0.0, 329.0, 329.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
        ),
        preset(
            "late-night-rnb", "Late Night R&B", "R&B", 89.0, Kit::Trap,
            "Minimal, intimate.",
            ["x.....x.....x...", BACKBEAT, HATS_8TH],
            [150.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 130.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
        ),
        preset(
            "epop-future", "E-Pop Future", "Pop", 120.0, Kit::Standard,
            "Tight, digital.",
            [FOUR_ON_THE_FLOOR, BACKBEAT, OFFBEAT_HATS],
            [261.0, 0.0, 0.0, 261.0, 329.0, 0.0, 0.0, 329.0, 392.0, 0.0, 0.0, 392.0, 523.0, 0.0, 0.0, 0.0],
        ),
        preset(
            "afro-edm-festival", "Afro EDM Festival", "Pop", 126.0, Kit::Electronic,
            "Build-drop structure.",
            [FOUR_ON_THE_FLOOR, "....x.......x.x.", HATS_8TH],
            [440.0, 440.0, 440.0, 0.0, 440.0, 440.0, 440.0, 0.0, 523.0, 523.0, 523.0, 0.0, 392.0, 392.0, 392.0, 0.0],
        ),
        preset(
            "tribal-afro-raw", "Tribal Afro Raw", "Traditional", 95.0, Kit::Afro,
            "Polyrhythmic, raw.",
            ["x.xx..x.x.xx..x.", ".x..x..x.x..x..x", "x..x..x..x..x..x"],
            [0.0, 0.0, 261.0, 0.0, 0.0, 0.0, 293.0, 0.0, 0.0, 0.0, 261.0, 0.0, 0.0, 0.0, 392.0, 0.0],
        ),
        preset(
            "afro-cinematic", "Afro Cinematic", "Cinematic", 85.0, Kit::Standard,
            "Slow, dramatic.",
            ["x.......x.....x.", SILENT, SILENT],
            [261.0, 261.0, 261.0, 261.0, 329.0, 329.0, 329.0, 329.0, 392.0, 392.0, 392.0, 392.0, 523.0, 523.0, 523.0, 523.0],
        ),
        preset(
            "tiktok-afro-loop", "TikTok Afro Loop", "Social", 103.0, Kit::Afro,
            "Simple, catchy, minimal kit.",
            ["x..x..x...x.x...", OFFBEAT_HATS, HATS_8TH],
            [523.0, 0.0, 0.0, 0.0, 523.0, 0.0, 0.0, 0.0, 587.0, 0.0, 0.0, 0.0, 587.0, 0.0, 0.0, 0.0],
        ),
        preset(
            "freestyle-neutral", "Freestyle Neutral", "Social", 94.0, Kit::Trap,
            "Simple, open.",
            ["x.....x...x.....", BACKBEAT, HATS_16TH],
            [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
        ),
        preset(
            "afro-future-bass", "Afro Future Bass", "Future", 116.0, Kit::Electronic,
            "Bouncy, modern.",
            ["x.x...x...x.x...", BACKBEAT, HATS_8TH],
            [261.0, 0.0, 0.0, 261.0, 0.0, 0.0, 329.0, 0.0, 0.0, 392.0, 0.0, 0.0, 523.0, 0.0, 0.0, 0.0],
        ),
        preset(
            "ambient-afro", "Ambient Afro", "Future", 78.0, Kit::Standard,
            "Sparse, pads.",
            ["x...............", SILENT, FOUR_ON_THE_FLOOR],
            [392.0, 0.0, 392.0, 0.0, 440.0, 0.0, 440.0, 0.0, 329.0, 0.0, 329.0, 0.0, 261.0, 0.0, 261.0, 0.0],
        ),
        preset(
            "club-afro-tech", "Club Afro Tech", "Future", 125.0, Kit::Electronic,
            "Driving, repetitive.",
            [FOUR_ON_THE_FLOOR, SILENT, OFFBEAT_HATS],
            [110.0, 0.0, 110.0, 0.0, 110.0, 0.0, 110.0, 0.0, 110.0, 0.0, 110.0, 0.0, 110.0, 0.0, 110.0, 0.0],
        ),
    ];
}

pub fn catalogue() -> &'static [Preset] {
    &PRESETS
}

pub fn find(id: &str) -> Option<&'static Preset> {
    PRESETS.iter().find(|p| p.id == id)
}

/// Presets grouped by category, categories in first-appearance order.
pub fn by_category() -> Vec<(&'static str, Vec<&'static Preset>)> {
    let mut groups: Vec<(&'static str, Vec<&'static Preset>)> = Vec::new();
    for preset in PRESETS.iter() {
        match groups.iter_mut().find(|(category, _)| *category == preset.category) {
            Some((_, members)) => members.push(preset),
            None => groups.push((preset.category, vec![preset])),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DEFAULT_GRID_LENGTH, MAX_BPM, MIN_BPM};
    use std::collections::HashSet;

    #[test]
    fn test_catalogue_is_well_formed() {
        let mut ids = HashSet::new();
        for preset in catalogue() {
            assert!(ids.insert(preset.id), "duplicate preset id {}", preset.id);
            assert!((MIN_BPM..=MAX_BPM).contains(&preset.bpm), "{} bpm", preset.id);
            assert!(
                preset.pattern.malformed_lanes(DEFAULT_GRID_LENGTH).is_empty(),
                "{} has a lane of the wrong length",
                preset.id
            );
        }
    }

    #[test]
    fn test_find() {
        let preset = find("amapiano-deep-log").unwrap();
        assert_eq!(preset.kit, Kit::Amapiano);
        assert_eq!(preset.bpm, 112.0);
        assert!(find("polka-classic").is_none());
    }

    #[test]
    fn test_by_category_keeps_order() {
        let groups = by_category();
        let names: Vec<&str> = groups.iter().map(|(c, _)| *c).collect();
        assert_eq!(names[0], "Phonk");
        assert_eq!(names.len(), names.iter().collect::<HashSet<_>>().len());

        let total: usize = groups.iter().map(|(_, members)| members.len()).sum();
        assert_eq!(total, catalogue().len());

        let phonk: Vec<&str> = groups[0].1.iter().map(|p| p.id).collect();
        assert_eq!(phonk[0], "drift-phonk-cowbell");
    }

    #[test]
    fn test_full_catalogue() {
        assert_eq!(catalogue().len(), 31);
        let names: Vec<&str> = by_category().iter().map(|(c, _)| *c).collect();
        assert_eq!(
            names,
            vec!["Phonk", "Events", "Cinematic", "Amapiano", "Afro", "Hip-Hop", "R&B", "Pop", "Traditional", "Social", "Future"]
        );

        let cinematic: Vec<&str> = by_category()
            .into_iter()
            .find(|(c, _)| *c == "Cinematic")
            .map(|(_, members)| members.iter().map(|p| p.id).collect())
            .unwrap();
        assert_eq!(cinematic, vec!["horror-spine-chiller", "horror-chase-scene", "afro-cinematic"]);

        let swing = find("birthday-jazz-swing").unwrap();
        assert_eq!(swing.bpm, 124.0);
        assert_eq!(swing.kit, Kit::Standard);
    }

    #[test]
    fn test_lane_shorthand() {
        assert_eq!(hits("x..x"), vec![true, false, false, true]);
        assert_eq!(hits(FOUR_ON_THE_FLOOR).iter().filter(|&&h| h).count(), 4);
    }
}
