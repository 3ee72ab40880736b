use super::Card;

/// The combinatorial rule deciding which three cards form a set.
pub trait SetRules: Send + Sync {
    fn is_legal_set(&self, cards: &[Card; 3]) -> bool;

    /// Up to `limit` legal sets among `cards`, in lexicographic index order.
    fn find_sets(&self, cards: &[Card], limit: usize) -> Vec<[Card; 3]> {
        let mut found = Vec::new();
        if limit == 0 {
            return found;
        }
        for i in 0..cards.len() {
            for j in i + 1..cards.len() {
                for k in j + 1..cards.len() {
                    let triple = [cards[i], cards[j], cards[k]];
                    if self.is_legal_set(&triple) {
                        found.push(triple);
                        if found.len() == limit {
                            return found;
                        }
                    }
                }
            }
        }
        found
    }

    /// Whether any three of `cards` form a legal set.
    fn has_any_set(&self, cards: &[Card]) -> bool {
        !self.find_sets(cards, 1).is_empty()
    }
}

/// The classic rule: a card id encodes `feature_count` features, each taking
/// one of `feature_size` values. Three cards are a set when every feature is
/// either the same on all three or different on all three.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureRules {
    feature_size: usize,
    feature_count: usize,
}

impl FeatureRules {
    pub fn new(feature_size: usize, feature_count: usize) -> Self {
        FeatureRules {
            feature_size,
            feature_count,
        }
    }

    /// Number of distinct cards under this encoding.
    pub fn deck_size(&self) -> usize {
        self.feature_size.pow(self.feature_count as u32)
    }

    /// Feature values of `card`, most significant feature first.
    pub fn card_features(&self, card: Card) -> Vec<usize> {
        let mut features = vec![0; self.feature_count];
        let mut rest = card;
        for feature in features.iter_mut().rev() {
            *feature = rest % self.feature_size;
            rest /= self.feature_size;
        }
        features
    }
}

impl Default for FeatureRules {
    fn default() -> Self {
        FeatureRules::new(3, 4)
    }
}

impl SetRules for FeatureRules {
    fn is_legal_set(&self, cards: &[Card; 3]) -> bool {
        if cards[0] == cards[1] || cards[1] == cards[2] || cards[0] == cards[2] {
            return false;
        }
        let [a, b, c] = cards.map(|card| self.card_features(card));
        (0..self.feature_count).all(|f| {
            let all_same = a[f] == b[f] && b[f] == c[f];
            let all_different = a[f] != b[f] && b[f] != c[f] && a[f] != c[f];
            all_same || all_different
        })
    }
}

/// Adapts a plain predicate into a rule set.
pub struct PredicateRules<F>(pub F);

impl<F> SetRules for PredicateRules<F>
where
    F: Fn(&[Card; 3]) -> bool + Send + Sync,
{
    fn is_legal_set(&self, cards: &[Card; 3]) -> bool {
        (self.0)(cards)
    }
}
