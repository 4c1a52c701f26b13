use crate::emotion::Mood;
use regex::Regex;
use std::sync::LazyLock;

// First matching row wins when scores tie, so more specific moods come first.
const KEYWORDS: &[(Mood, &[&str])] = &[
    (Mood::Grieving, &["grief", "grieving", "mourning", "passed away", "funeral", "loss of"]),
    (Mood::Anxious, &["anxious", "anxiety", "worried", "worry", "nervous", "panic", "stressed"]),
    (Mood::Fearful, &["afraid", "scared", "fear", "terrified", "frightened"]),
    (Mood::Lonely, &["lonely", "alone", "isolated", "nobody"]),
    (Mood::Sad, &["sad", "depressed", "unhappy", "heartbroken", "crying", "tears"]),
    (Mood::Angry, &["angry", "furious", "rage", "mad at"]),
    (Mood::Frustrated, &["frustrated", "annoyed", "fed up"]),
    (Mood::Confused, &["confused", "don't understand", "lost", "unsure"]),
    (Mood::Tired, &["tired", "exhausted", "weary", "burned out"]),
    (Mood::Prayerful, &["pray", "prayer", "amen"]),
    (Mood::Worshipful, &["worship", "praise", "hallelujah", "glory"]),
    (Mood::Reverent, &["lord", "holy", "scripture", "psalm", "verse"]),
    (Mood::Grateful, &["thank", "thankful", "grateful", "blessed"]),
    (Mood::Excited, &["excited", "amazing", "can't wait", "wow"]),
    (Mood::Joyful, &["happy", "joy", "rejoice", "delighted"]),
    (Mood::Hopeful, &["hope", "hopeful", "looking forward"]),
    (Mood::Peaceful, &["peace", "peaceful", "still", "rest"]),
];

// One whole-word, case-insensitive pattern per row, so "universe" never
// counts as "verse".
static KEYWORD_RES: LazyLock<Vec<(Mood, Regex)>> = LazyLock::new(|| {
    KEYWORDS
        .iter()
        .map(|(mood, words)| {
            let alternation = words
                .iter()
                .map(|w| regex::escape(w))
                .collect::<Vec<_>>()
                .join("|");
            let re = Regex::new(&format!(r"(?i)\b(?:{alternation})\b"))
                .expect("mood keywords compile to a valid regex");
            (*mood, re)
        })
        .collect()
});

/// Keyword-scored mood guess for free text. Returns [`Mood::Neutral`] when
/// nothing matches.
pub fn detect_mood(text: &str) -> Mood {
    let mut best = Mood::Neutral;
    let mut best_score = 0usize;
    for (mood, re) in KEYWORD_RES.iter() {
        let score = re.find_iter(text).count();
        if score > best_score {
            best = *mood;
            best_score = score;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_basic_moods() {
        assert_eq!(detect_mood("I am so worried about tomorrow"), Mood::Anxious);
        assert_eq!(detect_mood("I'm so happy today!"), Mood::Joyful);
        assert_eq!(detect_mood("Let us pray. Amen."), Mood::Prayerful);
        assert_eq!(detect_mood("Just a normal day."), Mood::Neutral);
    }

    #[test]
    fn higher_score_wins_over_row_order() {
        // One grief keyword against two gratitude keywords.
        assert_eq!(
            detect_mood("Thankful and blessed despite the grief"),
            Mood::Grateful
        );
    }

    #[test]
    fn keywords_inside_longer_words_do_not_count() {
        assert_eq!(detect_mood("The universe is vast."), Mood::Neutral);
        assert_eq!(detect_mood("I have an interest in forests."), Mood::Neutral);
        assert_eq!(detect_mood("The madness of crusades."), Mood::Neutral);
        assert_eq!(detect_mood("The distilled water was cloudy."), Mood::Neutral);
    }

    #[test]
    fn multi_word_keywords_still_match() {
        assert_eq!(detect_mood("I can't wait for the trip!"), Mood::Excited);
        assert_eq!(detect_mood("My grandmother passed away last week."), Mood::Grieving);
    }

    #[test]
    fn detection_is_case_insensitive() {
        assert_eq!(detect_mood("I AM TERRIFIED"), Mood::Fearful);
    }
}
