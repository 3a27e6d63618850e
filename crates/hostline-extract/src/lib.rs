//! Heuristic transcript mining: reconstructs a [`StructuredOutcome`] from
//! raw conversation text when the agent never emitted a tool call.
//!
//! This is a pure function boundary — text in, structured data out — with
//! no socket or persistence dependency, so every rule is unit-testable in
//! isolation. It is explicitly best-effort: the contract is the pattern
//! priority order, the name stoplist, and the confirmed/escalated decision
//! rule, not perfect extraction accuracy.

use hostline_types::{
    CallIntents, CatalogItem, CustomerInfo, OrderDetails, OrderItem, OutcomeSource,
    ReservationDetails, ReservationStatus, StructuredOutcome, TranscriptTurn, TurnRole,
};
use regex::Regex;
use std::sync::LazyLock;

/// Name candidates matching one of these (after cleaning) are rejected —
/// they are conversation filler, not names.
const NAME_STOPLIST: &[&str] = &[
    "fine", "ok", "okay", "yes", "no", "yeah", "sure", "good", "great", "thanks", "thank you",
    "calling", "here",
];

/// Caller-side name announcement patterns, in priority order. First match
/// wins; the assistant-side acknowledgment below is only consulted when
/// none of these match.
static CALLER_NAME_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\bmy name is\s+([a-z][a-z .'-]{0,40}?)(?:[.,!?\n]|$)",
        r"(?i)\bthis is\s+([a-z][a-z .'-]{0,40}?)(?:[.,!?\n]|$)",
        r"(?i)\bi'?\s?a?m\s+([a-z][a-z .'-]{0,40}?)(?:[.,!?\n]|$)",
        r"(?i)\b([a-z'-]+(?:\s+[a-z'-]+)?)\s+speaking\b",
        r"(?i)\bunder the name\s+([a-z][a-z .'-]{0,40}?)(?:[.,!?\n]|$)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("name pattern should compile"))
    .collect()
});

/// Assistant-side acknowledgment, e.g. "Thank you, Alex."
static ASSISTANT_ACK_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bthank you,?\s+([a-z][a-z .'-]{0,40}?)(?:[.,!?\n]|$)")
        .expect("ack pattern should compile")
});

/// 12-hour clock token, e.g. "7 pm", "6:30pm".
static CLOCK_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{1,2}(?::\d{2})?\s*(?:am|pm))\b").expect("clock pattern should compile")
});

/// Party size phrasings: "party of 4", "table for four", "for 6 people".
static PARTY_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\bparty of\s+(\d{1,2}|[a-z]+)\b",
        r"(?i)\btable for\s+(\d{1,2}|[a-z]+)\b",
        r"(?i)\bfor\s+(\d{1,2}|[a-z]+)\s+people\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("party pattern should compile"))
    .collect()
});

/// Explicit month-day phrase, e.g. "march 14th".
static MONTH_DAY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b((?:january|february|march|april|may|june|july|august|september|october|november|december)\s+\d{1,2}(?:st|nd|rd|th)?)\b",
    )
    .expect("month-day pattern should compile")
});

/// Explicit occasion phrase, e.g. "the occasion is our anniversary".
static OCCASION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\boccasion is\s+([a-z][a-z '-]{0,40}?)(?:[.,!?\n]|$)")
        .expect("occasion pattern should compile")
});

/// Bare occasion keywords, scanned when no explicit phrase is present.
const OCCASION_KEYWORDS: &[&str] = &[
    "birthday",
    "anniversary",
    "business dinner",
    "date night",
    "graduation",
    "engagement",
];

/// Sentences on the assistant side that recap the order; item mentions in
/// these count alongside caller mentions.
const ORDER_RECAP_MARKERS: &[&str] = &["your order", "you ordered", "order for"];

/// Whole-word intent cues. Substrings are not enough: "border" and
/// "reserved" must not flag an intent on their own.
static ORDER_INTENT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\border\b").expect("order intent pattern should compile")
});

static RESERVATION_INTENT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:reservation|reserve|table for)\b")
        .expect("reservation intent pattern should compile")
});

/// Mines the full turn history of one call into a [`StructuredOutcome`]
/// with `source = transcript_fallback`.
///
/// Deterministic and order-independent of the regex engine; what is pinned
/// is the pattern priority (first match wins), the stoplist, and the
/// confirmed/escalated rule.
pub fn extract_outcome(
    turns: &[TranscriptTurn],
    caller_phone: Option<&str>,
    catalog: &[CatalogItem],
) -> StructuredOutcome {
    let caller_text = join_role(turns, TurnRole::User);
    let assistant_text = join_role(turns, TurnRole::Assistant);
    let full_text = format!("{} {}", caller_text, assistant_text).to_lowercase();

    let (name, verified) = extract_name(&caller_text, &assistant_text, caller_phone);
    let explicit_time = CLOCK_PATTERN
        .captures(&full_text)
        .map(|c| c[1].trim().to_string());

    let items = match_items(&caller_text, &assistant_text, catalog);
    let order_intent = ORDER_INTENT_PATTERN.is_match(&full_text) || !items.is_empty();

    let reservation_intent = RESERVATION_INTENT_PATTERN.is_match(&full_text);
    let party_size = extract_party_size(&full_text);

    let mut outcome = StructuredOutcome::new(OutcomeSource::TranscriptFallback);
    outcome.customer = CustomerInfo {
        name,
        has_verified_name: verified,
        phone: caller_phone.map(str::to_string),
    };
    outcome.intents = CallIntents {
        order: order_intent,
        reservation: reservation_intent,
    };

    if order_intent {
        let total_cents = items.iter().map(|i| i.line_total_cents).sum();
        outcome.order = Some(OrderDetails {
            pickup_time: explicit_time
                .clone()
                .unwrap_or_else(|| "20 minutes".to_string()),
            total_cents,
            items,
        });
    }

    if reservation_intent {
        // Confirmed only when all three were explicit: a verified name, a
        // stated party size, and a stated time. Anything less escalates to
        // a human.
        let status = if verified && party_size.is_some() && explicit_time.is_some() {
            ReservationStatus::Confirmed
        } else {
            ReservationStatus::Escalated
        };
        outcome.reservation = Some(ReservationDetails {
            party_size: party_size.unwrap_or(2),
            date: extract_date(&full_text),
            time: explicit_time.unwrap_or_else(|| "ASAP".to_string()),
            occasion: extract_occasion(&full_text),
            status,
        });
    }

    outcome
}

fn join_role(turns: &[TranscriptTurn], role: TurnRole) -> String {
    turns
        .iter()
        .filter(|t| t.role == role)
        .map(|t| t.text.as_str())
        .collect::<Vec<_>>()
        .join(". ")
}

/// Tries the caller-side announcement patterns in priority order, then the
/// assistant-side acknowledgment, then fabricates a display name from the
/// phone number. `verified` is true only on a genuine pattern match.
fn extract_name(
    caller_text: &str,
    assistant_text: &str,
    caller_phone: Option<&str>,
) -> (String, bool) {
    for pattern in CALLER_NAME_PATTERNS.iter() {
        if let Some(captures) = pattern.captures(caller_text) {
            if let Some(name) = clean_name(&captures[1]) {
                return (name, true);
            }
        }
    }

    if let Some(captures) = ASSISTANT_ACK_PATTERN.captures(assistant_text) {
        if let Some(name) = clean_name(&captures[1]) {
            return (name, true);
        }
    }

    (fallback_name(caller_phone), false)
}

/// Validates and normalizes a raw name candidate. Returns `None` when the
/// candidate is empty after stripping non-letters, longer than 3 words, or
/// on the stoplist.
fn clean_name(raw: &str) -> Option<String> {
    let cleaned: Vec<String> = raw
        .split_whitespace()
        .map(|w| {
            w.chars()
                .filter(|c| c.is_alphabetic() || *c == '\'' || *c == '-')
                .collect::<String>()
        })
        .filter(|w| !w.is_empty())
        .collect();

    if cleaned.is_empty() || cleaned.len() > 3 {
        return None;
    }

    let joined_lower = cleaned.join(" ").to_lowercase();
    if NAME_STOPLIST.contains(&joined_lower.as_str()) {
        return None;
    }

    Some(
        cleaned
            .iter()
            .map(|w| title_case(w))
            .collect::<Vec<_>>()
            .join(" "),
    )
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(|c| c.to_lowercase())).collect(),
        None => String::new(),
    }
}

/// Fabricates "Caller NNNN" from the last 4 digits of the phone number, or
/// the literal "Caller" when no phone is known.
fn fallback_name(caller_phone: Option<&str>) -> String {
    let digits: String = caller_phone
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect();
    if digits.len() >= 4 {
        format!("Caller {}", &digits[digits.len() - 4..])
    } else {
        "Caller".to_string()
    }
}

/// Intersects catalog item names against the caller text plus assistant
/// order-recap sentences. Each match contributes quantity 1 at list price.
fn match_items(caller_text: &str, assistant_text: &str, catalog: &[CatalogItem]) -> Vec<OrderItem> {
    let caller_lower = caller_text.to_lowercase();
    let recap: String = assistant_text
        .to_lowercase()
        .split(['.', '!', '?'])
        .filter(|s| ORDER_RECAP_MARKERS.iter().any(|m| s.contains(m)))
        .collect::<Vec<_>>()
        .join(". ");

    catalog
        .iter()
        .filter(|item| {
            let name = item.name.to_lowercase();
            caller_lower.contains(&name) || recap.contains(&name)
        })
        .map(|item| OrderItem {
            name: item.name.clone(),
            menu_item_id: Some(item.id),
            qty: 1,
            line_total_cents: item.price_cents,
        })
        .collect()
}

fn extract_party_size(text: &str) -> Option<u32> {
    for pattern in PARTY_PATTERNS.iter() {
        if let Some(captures) = pattern.captures(text) {
            if let Some(n) = parse_count(&captures[1]) {
                return Some(n);
            }
        }
    }
    None
}

/// Parses a digit string or a number-word one..twelve.
fn parse_count(raw: &str) -> Option<u32> {
    if let Ok(n) = raw.parse::<u32>() {
        return (n > 0).then_some(n);
    }
    let words = [
        "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten", "eleven",
        "twelve",
    ];
    words
        .iter()
        .position(|w| w.eq_ignore_ascii_case(raw))
        .map(|i| i as u32 + 1)
}

fn extract_date(text: &str) -> String {
    if let Some(captures) = MONTH_DAY_PATTERN.captures(text) {
        return captures[1].to_string();
    }
    for keyword in ["tomorrow", "tonight", "today"] {
        if text.contains(keyword) {
            return keyword.to_string();
        }
    }
    "today".to_string()
}

fn extract_occasion(text: &str) -> String {
    if let Some(captures) = OCCASION_PATTERN.captures(text) {
        return captures[1].trim().to_string();
    }
    for keyword in OCCASION_KEYWORDS {
        if text.contains(keyword) {
            return keyword.to_string();
        }
    }
    "Not specified".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(text: &str) -> TranscriptTurn {
        TranscriptTurn::new(TurnRole::User, text)
    }

    fn assistant(text: &str) -> TranscriptTurn {
        TranscriptTurn::new(TurnRole::Assistant, text)
    }

    fn catalog() -> Vec<CatalogItem> {
        vec![
            CatalogItem {
                id: 1,
                name: "margherita pizza".to_string(),
                price_cents: 1450,
                available: true,
            },
            CatalogItem {
                id: 2,
                name: "caesar salad".to_string(),
                price_cents: 950,
                available: true,
            },
        ]
    }

    #[test]
    fn announced_name_is_extracted_and_verified() {
        let turns = [user("Hello. My name is Alex Rivera.")];
        let outcome = extract_outcome(&turns, None, &[]);
        assert_eq!(outcome.customer.name, "Alex Rivera");
        assert!(outcome.customer.has_verified_name);
    }

    #[test]
    fn name_patterns_apply_in_priority_order() {
        // "my name is" outranks "this is" even when both appear.
        let turns = [user("Hi, this is Sam. Actually my name is Jordan Park.")];
        let outcome = extract_outcome(&turns, None, &[]);
        assert_eq!(outcome.customer.name, "Jordan Park");
    }

    #[test]
    fn assistant_ack_is_a_fallback_only() {
        let turns = [
            user("Hi, I'd like a table."),
            assistant("Thank you, Morgan. What time works?"),
        ];
        let outcome = extract_outcome(&turns, None, &[]);
        assert_eq!(outcome.customer.name, "Morgan");
        assert!(outcome.customer.has_verified_name);

        // A caller-side pattern outranks the acknowledgment.
        let turns = [
            user("This is Riley."),
            assistant("Thank you, Morgan. What time works?"),
        ];
        let outcome = extract_outcome(&turns, None, &[]);
        assert_eq!(outcome.customer.name, "Riley");
    }

    #[test]
    fn stoplist_words_are_not_names() {
        let turns = [user("I'm fine, thanks. I want to order.")];
        let outcome = extract_outcome(&turns, Some("+15551234567"), &[]);
        assert_eq!(outcome.customer.name, "Caller 4567");
        assert!(!outcome.customer.has_verified_name);
    }

    #[test]
    fn long_candidates_are_rejected() {
        let turns = [user("my name is really not important right now")];
        let outcome = extract_outcome(&turns, None, &[]);
        assert_eq!(outcome.customer.name, "Caller");
        assert!(!outcome.customer.has_verified_name);
    }

    #[test]
    fn fallback_name_uses_last_four_phone_digits() {
        let outcome = extract_outcome(&[user("hello there")], Some("+15551234567"), &[]);
        assert_eq!(outcome.customer.name, "Caller 4567");
        assert!(!outcome.customer.has_verified_name);

        let outcome = extract_outcome(&[user("hello there")], None, &[]);
        assert_eq!(outcome.customer.name, "Caller");
    }

    #[test]
    fn catalog_items_matched_from_caller_text() {
        let turns = [user("I'd like to order a margherita pizza and a caesar salad")];
        let outcome = extract_outcome(&turns, None, &catalog());
        assert!(outcome.intents.order);
        let order = outcome.order.expect("order details");
        assert_eq!(order.items.len(), 2);
        assert_eq!(order.total_cents, 1450 + 950);
        assert_eq!(order.pickup_time, "20 minutes");
    }

    #[test]
    fn items_matched_from_assistant_recap_sentences_only() {
        let turns = [
            user("yes that's right, one of those"),
            assistant("Great, your order is one caesar salad. We also sell margherita pizza."),
        ];
        let outcome = extract_outcome(&turns, None, &catalog());
        let order = outcome.order.expect("order details");
        // Only the recap sentence counts; the upsell sentence does not.
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].name, "caesar salad");
        assert_eq!(order.items[0].qty, 1);
    }

    #[test]
    fn order_intent_from_keyword_without_items() {
        let turns = [user("I want to place an order for pickup")];
        let outcome = extract_outcome(&turns, None, &catalog());
        assert!(outcome.intents.order);
        assert_eq!(outcome.order.expect("order").total_cents, 0);
    }

    #[test]
    fn pickup_time_uses_first_clock_token() {
        let turns = [user("I'd like to order a caesar salad for 6:30 pm, or maybe 7 pm")];
        let outcome = extract_outcome(&turns, None, &catalog());
        assert_eq!(outcome.order.expect("order").pickup_time, "6:30 pm");
    }

    #[test]
    fn reservation_confirmed_requires_all_three_conditions() {
        let turns = [user("My name is Alex Rivera. I need a table for 4 at 7 pm.")];
        let outcome = extract_outcome(&turns, None, &[]);
        let reservation = outcome.reservation.expect("reservation");
        assert_eq!(reservation.status, ReservationStatus::Confirmed);
        assert_eq!(reservation.party_size, 4);
        assert_eq!(reservation.time, "7 pm");
    }

    #[test]
    fn missing_any_condition_escalates() {
        // No verified name.
        let turns = [user("I need a table for 4 at 7 pm.")];
        let outcome = extract_outcome(&turns, None, &[]);
        assert_eq!(
            outcome.reservation.expect("reservation").status,
            ReservationStatus::Escalated
        );

        // No explicit time.
        let turns = [user("My name is Alex Rivera. I need a table for 4.")];
        let outcome = extract_outcome(&turns, None, &[]);
        assert_eq!(
            outcome.reservation.expect("reservation").status,
            ReservationStatus::Escalated
        );

        // No explicit party size.
        let turns = [user("My name is Alex Rivera. I'd like a reservation at 7 pm.")];
        let outcome = extract_outcome(&turns, None, &[]);
        let reservation = outcome.reservation.expect("reservation");
        assert_eq!(reservation.status, ReservationStatus::Escalated);
        assert_eq!(reservation.party_size, 2, "party size defaults to 2");
    }

    #[test]
    fn party_size_accepts_number_words() {
        let turns = [user("reservation please, party of six tonight")];
        let outcome = extract_outcome(&turns, None, &[]);
        let reservation = outcome.reservation.expect("reservation");
        assert_eq!(reservation.party_size, 6);
        assert_eq!(reservation.date, "tonight");
        assert_eq!(reservation.time, "ASAP");
    }

    #[test]
    fn explicit_month_day_outranks_day_keywords() {
        let turns = [user("I'd like to reserve a table for march 14th, not today")];
        let outcome = extract_outcome(&turns, None, &[]);
        assert_eq!(outcome.reservation.expect("reservation").date, "march 14th");
    }

    #[test]
    fn occasion_phrase_outranks_bare_keyword() {
        let turns = [user(
            "table for two tomorrow, the occasion is our tenth anniversary",
        )];
        let outcome = extract_outcome(&turns, None, &[]);
        assert_eq!(
            outcome.reservation.expect("reservation").occasion,
            "our tenth anniversary"
        );

        let turns = [user("table for two tomorrow, it's a birthday")];
        let outcome = extract_outcome(&turns, None, &[]);
        assert_eq!(outcome.reservation.expect("reservation").occasion, "birthday");
    }

    #[test]
    fn intent_words_must_stand_alone() {
        // "border" carries no order intent.
        let turns = [user("are you the place near the border crossing?")];
        let outcome = extract_outcome(&turns, None, &catalog());
        assert!(!outcome.intents.order);
        assert!(outcome.order.is_none());

        // "reserved" is not a reservation request.
        let turns = [user("someone said the whole place was reserved tonight")];
        let outcome = extract_outcome(&turns, None, &[]);
        assert!(!outcome.intents.reservation);
        assert!(outcome.reservation.is_none());
    }

    #[test]
    fn no_intent_yields_empty_outcome() {
        let turns = [user("sorry, wrong number")];
        let outcome = extract_outcome(&turns, None, &catalog());
        assert!(!outcome.intents.order);
        assert!(!outcome.intents.reservation);
        assert!(outcome.order.is_none());
        assert!(outcome.reservation.is_none());
        assert_eq!(outcome.source, OutcomeSource::TranscriptFallback);
    }

    #[test]
    fn extraction_is_deterministic() {
        let turns = [
            user("My name is Alex Rivera. Table for 4 at 7 pm, and I'd like to order a caesar salad."),
            assistant("Thank you, Alex. Your order is one caesar salad."),
        ];
        let first = extract_outcome(&turns, Some("+15551234567"), &catalog());
        let second = extract_outcome(&turns, Some("+15551234567"), &catalog());
        assert_eq!(
            format!("{:?}", first),
            format!("{:?}", second),
            "same input must produce the same outcome"
        );
    }
}
