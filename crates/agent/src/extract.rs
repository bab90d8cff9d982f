use std::sync::Arc;

use haulbot_core::{field_labels, CriteriaField, EquipmentType, LoadCriteria, PartialCriteria};

use crate::llm::{clarification_prompt, LlmClient, ASSIST_APOLOGY};

/// Result of one extraction pass over one inbound message.
#[derive(Clone, Debug)]
pub enum Extraction {
    Complete(LoadCriteria),
    /// Required fields are still missing after merging this turn; `message`
    /// is the clarification to show the user.
    Clarify { partial: PartialCriteria, missing: Vec<CriteriaField>, message: String },
}

/// Deterministic load-criteria extraction with a one-shot assist fallback.
///
/// The pattern rules are fixed, independent per field, and run over the
/// lower-cased input; the assist call happens at most once per invocation
/// and only when required fields are still missing after the merge.
pub struct CriteriaExtractor {
    assist: Arc<dyn LlmClient>,
}

impl CriteriaExtractor {
    pub fn new(assist: Arc<dyn LlmClient>) -> Self {
        Self { assist }
    }

    /// Never fails: service trouble degrades to an apology message, not an
    /// error.
    pub async fn extract(&self, text: &str, prior: &PartialCriteria) -> Extraction {
        let merged = apply_turn(prior, &scan_turn(text));

        match merged.clone().into_complete() {
            Ok(criteria) => Extraction::Complete(criteria),
            Err(missing) => {
                let reply = match self.assist.complete(&clarification_prompt(text, &missing)).await
                {
                    Ok(reply) if !reply.trim().is_empty() => reply.trim().to_string(),
                    Ok(_) => ASSIST_APOLOGY.to_string(),
                    Err(error) => {
                        tracing::warn!(error = %error, "assist completion failed");
                        ASSIST_APOLOGY.to_string()
                    }
                };

                // The missing fields are always named deterministically; the
                // assist text only softens the ask.
                let message = format!("{reply}\n\nI still need: {}.", field_labels(&missing));
                Extraction::Clarify { partial: merged, missing, message }
            }
        }
    }
}

/// Fields the current turn actually mentioned. `None` leaves the accumulated
/// value (or its seeded default) untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct TurnMatches {
    shipper_city: Option<String>,
    consignee_city: Option<String>,
    bill_distance: Option<u32>,
    weight: Option<u32>,
    equipment: Option<EquipmentType>,
    hazmat: Option<bool>,
    driver_assistance: Option<bool>,
    extra_stops: Option<u32>,
    tolls: Option<bool>,
}

fn scan_turn(text: &str) -> TurnMatches {
    let tokens = tokenize(text);

    TurnMatches {
        shipper_city: extract_locality(&tokens, &["from", "shipper", "origin", "pickup"]),
        consignee_city: extract_locality(&tokens, &["to", "consignee", "destination", "delivery"]),
        bill_distance: extract_quantity(&tokens, &["mi", "mile", "miles"], &["distance"]),
        weight: extract_quantity(
            &tokens,
            &["lb", "lbs", "pound", "pounds"],
            &["weight", "weighs", "weighing"],
        ),
        equipment: extract_equipment(&tokens),
        hazmat: extract_flag(&tokens, &["hazmat", "hazardous"]),
        driver_assistance: extract_flag(&tokens, &["assistance", "assist", "assisted"]),
        extra_stops: extract_stops(&tokens),
        tolls: extract_flag(&tokens, &["toll", "tolls"]),
    }
}

fn apply_turn(prior: &PartialCriteria, matches: &TurnMatches) -> PartialCriteria {
    PartialCriteria {
        shipper_city: matches.shipper_city.clone().or_else(|| prior.shipper_city.clone()),
        consignee_city: matches.consignee_city.clone().or_else(|| prior.consignee_city.clone()),
        bill_distance: matches.bill_distance.or(prior.bill_distance),
        weight: matches.weight.or(prior.weight),
        equipment: matches.equipment.unwrap_or(prior.equipment),
        hazmat: matches.hazmat.unwrap_or(prior.hazmat),
        driver_assistance: matches.driver_assistance.unwrap_or(prior.driver_assistance),
        extra_stops: matches.extra_stops.unwrap_or(prior.extra_stops),
        tolls: matches.tolls.unwrap_or(prior.tolls),
    }
}

fn tokenize(text: &str) -> Vec<String> {
    let normalized = text.to_ascii_lowercase();
    let mut sanitized = String::with_capacity(normalized.len());
    for character in normalized.chars() {
        // Commas survive so grouped numbers like `40,000` stay one token.
        if character.is_ascii_alphanumeric() || character == ',' {
            sanitized.push(character);
        } else {
            sanitized.push(' ');
        }
    }

    sanitized
        .split_whitespace()
        .map(|token| token.trim_matches(',').to_string())
        .filter(|token| !token.is_empty())
        .collect()
}

/// Non-negative integer with optional comma grouping or a `k` suffix.
fn parse_count(token: &str) -> Option<u32> {
    let cleaned = token.replace(',', "");
    let (digits, multiplier) =
        match cleaned.strip_suffix('k') {
            Some(prefix) => (prefix, 1_000u64),
            None => (cleaned.as_str(), 1u64),
        };
    if digits.is_empty() || !digits.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }

    let value = digits.parse::<u64>().ok()?.checked_mul(multiplier)?;
    u32::try_from(value).ok()
}

const CAPTURE_FILLER: &[&str] = &["city", "is", "in", "of", "the", "at"];

const CAPTURE_STOP: &[&str] = &[
    // field keywords
    "from", "to", "shipper", "consignee", "origin", "destination", "pickup", "delivery",
    "distance", "weight", "weighs", "weighing", "equipment", "trailer", "type",
    // units
    "mi", "mile", "miles", "lb", "lbs", "pound", "pounds",
    // equipment words
    "van", "dry", "reefer", "refrigerated", "flatbed", "power", "only", "moffett", "oversize",
    "oversized",
    // flags
    "hazmat", "hazardous", "driver", "assistance", "assist", "assisted", "extra", "stop", "stops",
    "toll", "tolls", "yes", "no",
    // chatter that precedes the interesting tokens
    "a", "an", "i", "we", "me", "my", "our", "you", "it", "get", "got", "have", "has", "need",
    "needs", "want", "would", "like", "please", "quote", "rate", "load", "shipment", "shipping",
    "going", "run", "for", "with", "and",
];

fn is_capture_stop(token: &str) -> bool {
    CAPTURE_STOP.contains(&token) || parse_count(token).is_some()
}

/// City capture: the tokens after a lane keyword, up to the next recognized
/// keyword or number. The first keyword occurrence that yields anything wins.
fn extract_locality(tokens: &[String], keywords: &[&str]) -> Option<String> {
    for (index, token) in tokens.iter().enumerate() {
        if !keywords.contains(&token.as_str()) {
            continue;
        }

        let mut captured = Vec::new();
        for candidate in tokens.iter().skip(index + 1) {
            if captured.is_empty() && CAPTURE_FILLER.contains(&candidate.as_str()) {
                continue;
            }
            if is_capture_stop(candidate) || captured.len() == 3 {
                break;
            }
            captured.push(candidate.clone());
        }

        if !captured.is_empty() {
            return Some(captured.join(" "));
        }
    }
    None
}

/// Unit-suffixed or label-prefixed number. A matched non-numeric token
/// leaves the field unset rather than failing.
fn extract_quantity(tokens: &[String], units: &[&str], labels: &[&str]) -> Option<u32> {
    for window in tokens.windows(2) {
        if let [value, unit] = window {
            if units.contains(&unit.as_str()) {
                if let Some(parsed) = parse_count(value) {
                    return Some(parsed);
                }
            }
        }
    }

    for token in tokens {
        for unit in units.iter().copied() {
            if let Some(prefix) = token.strip_suffix(unit) {
                if !prefix.is_empty() {
                    if let Some(parsed) = parse_count(prefix) {
                        return Some(parsed);
                    }
                }
            }
        }
    }

    for (index, token) in tokens.iter().enumerate() {
        if !labels.contains(&token.as_str()) {
            continue;
        }
        for candidate in tokens.iter().skip(index + 1).take(3) {
            if let Some(parsed) = parse_count(candidate) {
                return Some(parsed);
            }
            if !CAPTURE_FILLER.contains(&candidate.as_str()) {
                break;
            }
        }
    }

    None
}

fn extract_equipment(tokens: &[String]) -> Option<EquipmentType> {
    // Labeled form first: `equipment type: RM`, `trailer: V`.
    for (index, token) in tokens.iter().enumerate() {
        if token != "equipment" && token != "trailer" {
            continue;
        }
        for candidate in tokens.iter().skip(index + 1).take(3) {
            if candidate == "type" || CAPTURE_FILLER.contains(&candidate.as_str()) {
                continue;
            }
            if let Some(parsed) = EquipmentType::parse_code(candidate) {
                return Some(parsed);
            }
            break;
        }
    }

    let has = |word: &str| tokens.iter().any(|token| token == word);
    let moffett = has("moffett");

    if has("power") && has("only") {
        return Some(EquipmentType::PowerOnly);
    }
    if has("reefer") || has("refrigerated") {
        return Some(if moffett { EquipmentType::ReeferMoffett } else { EquipmentType::Reefer });
    }
    if has("flatbed") {
        if moffett {
            return Some(EquipmentType::FlatbedMoffett);
        }
        if has("oversize") || has("oversized") {
            return Some(EquipmentType::FlatbedOversize);
        }
        return Some(EquipmentType::Flatbed);
    }
    if has("van") {
        return Some(if moffett { EquipmentType::VanMoffett } else { EquipmentType::Van });
    }

    None
}

const FLAG_FILLER: &[&str] = &["is", "routing", "required", "needed"];

/// Yes/no flag keyed off a keyword: an explicit yes/no qualifier wins, a
/// leading negation wins next, a bare mention reads as yes.
fn extract_flag(tokens: &[String], keywords: &[&str]) -> Option<bool> {
    let index = tokens.iter().position(|token| keywords.contains(&token.as_str()))?;

    for candidate in tokens.iter().skip(index + 1).take(3) {
        match candidate.as_str() {
            "yes" | "y" => return Some(true),
            "no" | "n" | "none" => return Some(false),
            other if FLAG_FILLER.contains(&other) => continue,
            _ => break,
        }
    }

    let negated = tokens[..index]
        .iter()
        .rev()
        .take(2)
        .any(|token| matches!(token.as_str(), "no" | "non" | "without"));
    if negated {
        return Some(false);
    }

    Some(true)
}

fn extract_stops(tokens: &[String]) -> Option<u32> {
    for (index, token) in tokens.iter().enumerate() {
        if token != "stop" && token != "stops" {
            continue;
        }

        let mut preceding = tokens[..index].iter().rev().take(2);
        if let Some(previous) = preceding.next() {
            let count_token = if previous == "extra" { preceding.next() } else { Some(previous) };
            if let Some(count_token) = count_token {
                if let Some(parsed) = parse_count(count_token) {
                    return Some(parsed);
                }
                if count_token == "no" {
                    return Some(0);
                }
            }
        }

        if let Some(following) = tokens.get(index + 1) {
            if let Some(parsed) = parse_count(following) {
                return Some(parsed);
            }
        }
    }
    None
}
