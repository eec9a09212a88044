//! Built-in catalog of common device problems, loaded into an empty store
//! on first start so the engine is useful before it has learned anything.

use std::collections::BTreeSet;

use super::records::NewProblem;
use crate::types::SolutionStep;

fn problem(
  text: &str,
  problem_type: &str,
  device: &str,
  codes: &[&str],
  causes: &[&str],
  steps: &[&str],
  confidence: f32,
  success_rate: f32,
) -> NewProblem {
  NewProblem {
    problem_text: text.to_string(),
    problem_type: problem_type.to_string(),
    device_category: Some(device.to_string()),
    error_codes: codes.iter().map(|c| c.to_string()).collect::<BTreeSet<_>>(),
    possible_causes: causes.iter().map(|c| c.to_string()).collect(),
    solution_steps: steps
      .iter()
      .enumerate()
      .map(|(i, s)| SolutionStep::new(i as u32 + 1, *s))
      .collect(),
    confidence_score: confidence,
    success_rate,
  }
}

/// The starter catalog. Deliberately small; the engine learns the rest.
pub fn catalog() -> Vec<NewProblem> {
  vec![
    problem(
      "tv screen is black but power light is on",
      "display",
      "television",
      &["BLACK_SCREEN", "NO_DISPLAY"],
      &["TV stuck in standby mode", "Wrong input source selected", "Backlight failure"],
      &[
        "Press the power button to leave standby mode",
        "Cycle through input sources (HDMI, AV)",
        "Reset the TV to factory settings",
        "Check backlight settings",
        "Contact a technician if the problem persists",
      ],
      0.95,
      0.88,
    ),
    problem(
      "tv has no sound",
      "audio",
      "television",
      &["NO_AUDIO", "MUTED"],
      &["TV muted", "Audio output routed to disconnected speakers"],
      &[
        "Press the mute button and raise the volume",
        "Check the audio output settings",
        "Try a different audio source",
        "Check external speakers if connected",
        "Reset audio settings to default",
      ],
      0.92,
      0.85,
    ),
    problem(
      "tv remote not working",
      "remote",
      "television",
      &["REMOTE_DEAD", "NO_RESPONSE"],
      &["Dead batteries", "Remote unpaired from the TV"],
      &[
        "Replace the remote batteries",
        "Clean the remote buttons",
        "Re-pair the remote with the TV",
        "Remove the batteries for five minutes and retry",
        "Replace the remote if the problem persists",
      ],
      0.90,
      0.82,
    ),
    problem(
      "tv cannot connect to wifi",
      "network",
      "television",
      &["WIFI_ERROR", "CONNECTION_FAILED"],
      &["Wrong WiFi password", "Router out of range", "Outdated TV firmware"],
      &[
        "Verify the WiFi password",
        "Restart the TV and the router",
        "Move the TV closer to the router",
        "Try connecting to a mobile hotspot",
        "Update the TV firmware",
      ],
      0.88,
      0.80,
    ),
    problem(
      "phone battery drains quickly",
      "battery",
      "smartphone",
      &["BATTERY_DRAIN"],
      &["Background apps consuming power", "High screen brightness", "Aging battery"],
      &[
        "Check battery usage in settings",
        "Close background apps",
        "Reduce screen brightness",
        "Disable location services when unused",
        "Replace the battery if it is old",
      ],
      0.93,
      0.87,
    ),
    problem(
      "phone won't charge",
      "charging",
      "smartphone",
      &["CHARGING_ERROR", "NO_CHARGE"],
      &["Faulty cable or adapter", "Debris in the charging port"],
      &[
        "Try a different charging cable",
        "Clean the charging port with compressed air",
        "Try a different power adapter",
        "Restart the phone",
        "Try wireless charging if available",
        "Contact a technician for a port repair",
      ],
      0.91,
      0.84,
    ),
    problem(
      "phone is slow and laggy",
      "performance",
      "smartphone",
      &["SLOW_PERFORMANCE"],
      &["Full storage", "Outdated software", "Too many installed apps"],
      &[
        "Restart the phone",
        "Clear app cache and data",
        "Uninstall unused apps",
        "Update the phone software",
        "Free up storage space",
        "Factory-reset as a last resort",
      ],
      0.89,
      0.83,
    ),
    problem(
      "smartwatch not syncing with phone",
      "sync",
      "smartwatch",
      &["SYNC_ERROR", "PAIRING_FAILED"],
      &["Bluetooth disabled", "Stale pairing", "Outdated companion app"],
      &[
        "Restart both the watch and the phone",
        "Check that Bluetooth is enabled",
        "Forget the device and re-pair",
        "Update the watch and phone apps",
        "Reset the watch to factory settings",
      ],
      0.87,
      0.81,
    ),
    problem(
      "smart bulb not connecting to wifi",
      "network",
      "iot",
      &["WIFI_CONNECTION_FAILED", "PAIRING_ERROR"],
      &["Bulb not in pairing mode", "5 GHz-only network", "Router too far away"],
      &[
        "Put the bulb in pairing mode",
        "Verify the WiFi password",
        "Use a 2.4 GHz network",
        "Move the bulb closer to the router",
        "Reset the bulb to factory settings",
      ],
      0.84,
      0.77,
    ),
    problem(
      "smart speaker not responding to voice",
      "voice",
      "iot",
      &["VOICE_NOT_RECOGNIZED", "MICROPHONE_ERROR"],
      &["Microphone muted", "Dirty microphone grille", "Outdated firmware"],
      &[
        "Check that the microphone is not muted",
        "Clean the microphone area",
        "Restart the speaker",
        "Check the voice assistant settings",
        "Update the speaker firmware",
      ],
      0.83,
      0.76,
    ),
  ]
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn catalog_entries_are_well_formed() {
    let entries = catalog();
    assert!(!entries.is_empty());
    for entry in entries {
      assert!(!entry.problem_text.is_empty());
      assert!(!entry.solution_steps.is_empty());
      assert!((0.0..=1.0).contains(&entry.confidence_score));
      assert!((0.0..=1.0).contains(&entry.success_rate));
      let numbers: Vec<u32> = entry.solution_steps.iter().map(|s| s.step_number).collect();
      let expected: Vec<u32> = (1..=numbers.len() as u32).collect();
      assert_eq!(numbers, expected, "steps for {:?}", entry.problem_text);
    }
  }

  #[test]
  fn catalog_texts_are_unique() {
    let entries = catalog();
    let mut texts: Vec<&str> = entries.iter().map(|e| e.problem_text.as_str()).collect();
    texts.sort();
    texts.dedup();
    assert_eq!(texts.len(), entries.len());
  }
}
