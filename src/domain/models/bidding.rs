//! Task bidding domain model. Bids are submitted directly against an
//! opaque `task_id` — there is no first-class "auction" entity in this
//! system, consistent with task execution itself being out of the
//! kernel's scope.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Status of a single bid. Mirrors the spawn-queue item's pending/
/// terminal split: `pending` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BidStatus {
    Pending,
    Accepted,
    Rejected,
}

impl BidStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "accepted" => Some(Self::Accepted),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

/// A single bid against a task. Unique per `(task_id, bidder_handle)`
/// while `status = pending`; resubmitting upserts rather than duplicating.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskBid {
    pub id: String,
    pub task_id: String,
    pub bidder_handle: String,
    pub amount: f64,
    pub confidence: f64,
    pub status: BidStatus,
    pub created_at: i64,
}

impl TaskBid {
    pub fn new(id: String, task_id: String, bidder_handle: String, amount: f64, confidence: f64, created_at: i64) -> Self {
        Self { id, task_id, bidder_handle, amount, confidence, status: BidStatus::Pending, created_at }
    }
}

/// Weights for `evaluate_bids`'s linear scoring function. Need not sum to
/// one; the score is a plain weighted sum, not a normalized probability.
#[derive(Debug, Clone, Copy)]
pub struct BidWeights {
    pub bid: f64,
    pub confidence: f64,
    pub reputation: f64,
}

impl Default for BidWeights {
    fn default() -> Self {
        Self { bid: 0.4, confidence: 0.3, reputation: 0.3 }
    }
}

/// One bid's linear score from `evaluate_bids`, alongside the inputs that
/// produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredBid {
    pub bid: TaskBid,
    pub normalized_bid: f64,
    pub reputation: f64,
    pub score: f64,
}

/// Min-max normalize `amount` into `[0, 1]` against the bid pool's range.
/// `prefer_lower_bids` flips the direction so a cheaper bid scores higher;
/// a degenerate pool (every bid equal) normalizes everything to `1.0`
/// rather than dividing by zero.
fn normalize(amount: f64, min: f64, max: f64, prefer_lower_bids: bool) -> f64 {
    if (max - min).abs() < f64::EPSILON {
        return 1.0;
    }
    let frac = (amount - min) / (max - min);
    if prefer_lower_bids {
        1.0 - frac
    } else {
        frac
    }
}

/// Score every bid as `w_bid*normalizedBid + w_conf*confidence +
/// w_rep*reputation` and return them sorted highest-score first.
/// Reputation defaults to `0.5` (the same neutral default `getOrCreate`
/// uses) for a bidder with no credit account yet.
pub fn evaluate_bids(bids: &[TaskBid], reputations: &HashMap<String, f64>, weights: BidWeights, prefer_lower_bids: bool) -> Vec<ScoredBid> {
    if bids.is_empty() {
        return Vec::new();
    }
    let min = bids.iter().map(|b| b.amount).fold(f64::INFINITY, f64::min);
    let max = bids.iter().map(|b| b.amount).fold(f64::NEG_INFINITY, f64::max);

    let mut scored: Vec<ScoredBid> = bids
        .iter()
        .map(|bid| {
            let normalized_bid = normalize(bid.amount, min, max, prefer_lower_bids);
            let reputation = reputations.get(&bid.bidder_handle).copied().unwrap_or(0.5);
            let score = weights.bid * normalized_bid + weights.confidence * bid.confidence + weights.reputation * reputation;
            ScoredBid { bid: bid.clone(), normalized_bid, reputation, score }
        })
        .collect();

    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap()
            .then_with(|| a.bid.created_at.cmp(&b.bid.created_at))
    });
    scored
}

/// Result of closing a bidding round, under either the first- or
/// second-price rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuctionAward {
    pub winner_handle: Option<String>,
    pub winning_bid_amount: Option<f64>,
    pub effective_price: Option<f64>,
}

fn no_award() -> AuctionAward {
    AuctionAward { winner_handle: None, winning_bid_amount: None, effective_price: None }
}

/// First-price rule: the highest-scored bid wins and pays its own amount.
pub fn award_first_price(scored: &[ScoredBid]) -> AuctionAward {
    match scored.first() {
        Some(top) => AuctionAward {
            winner_handle: Some(top.bid.bidder_handle.clone()),
            winning_bid_amount: Some(top.bid.amount),
            effective_price: Some(top.bid.amount),
        },
        None => no_award(),
    }
}

/// Second-price (Vickrey) rule: the bidder with the highest raw amount
/// wins, but the effective price charged is the second-highest bid (their
/// own, if they are the only bidder). Ties on amount break by earliest
/// submission. The stored bid amount is never rewritten to the effective
/// price — kept for audit, per an explicit open-question decision.
pub fn award_second_price(bids: &[TaskBid]) -> AuctionAward {
    if bids.is_empty() {
        return no_award();
    }

    let mut sorted: Vec<&TaskBid> = bids.iter().collect();
    sorted.sort_by(|a, b| {
        b.amount
            .partial_cmp(&a.amount)
            .unwrap()
            .then_with(|| a.created_at.cmp(&b.created_at))
    });

    let winner = sorted[0];
    let effective_price = sorted.get(1).map(|b| b.amount).unwrap_or(winner.amount);

    AuctionAward {
        winner_handle: Some(winner.bidder_handle.clone()),
        winning_bid_amount: Some(winner.amount),
        effective_price: Some(effective_price),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bid(handle: &str, amount: f64, created_at: i64) -> TaskBid {
        TaskBid::new(format!("bid-{handle}"), "task".into(), handle.into(), amount, 0.5, created_at)
    }

    #[test]
    fn second_price_winner_is_highest_raw_bid() {
        let bids = vec![bid("a", 10.0, 0), bid("b", 8.0, 1), bid("c", 6.0, 2)];
        let award = award_second_price(&bids);
        assert_eq!(award.winner_handle, Some("a".to_string()));
        assert_eq!(award.winning_bid_amount, Some(10.0));
        assert_eq!(award.effective_price, Some(8.0));
    }

    #[test]
    fn single_bidder_pays_own_bid() {
        let bids = vec![bid("alpha", 15.0, 0)];
        let award = award_second_price(&bids);
        assert_eq!(award.effective_price, Some(15.0));
    }

    #[test]
    fn tie_for_highest_breaks_by_earliest_submission() {
        let bids = vec![bid("beta", 10.0, 1), bid("alpha", 10.0, 0)];
        let award = award_second_price(&bids);
        assert_eq!(award.winner_handle, Some("alpha".to_string()));
        assert_eq!(award.effective_price, Some(10.0));
    }

    #[test]
    fn prefer_lower_bids_flips_normalization_direction() {
        let bids = vec![bid("cheap", 5.0, 0), bid("pricey", 20.0, 1)];
        let mut reps = HashMap::new();
        reps.insert("cheap".to_string(), 0.5);
        reps.insert("pricey".to_string(), 0.5);
        let weights = BidWeights { bid: 1.0, confidence: 0.0, reputation: 0.0 };

        let normal = evaluate_bids(&bids, &reps, weights, false);
        assert_eq!(normal[0].bid.bidder_handle, "pricey");

        let inverted = evaluate_bids(&bids, &reps, weights, true);
        assert_eq!(inverted[0].bid.bidder_handle, "cheap");
    }

    #[test]
    fn first_price_awards_top_scored_bid_its_own_amount() {
        let bids = vec![bid("a", 10.0, 0), bid("b", 30.0, 1)];
        let scored = evaluate_bids(&bids, &HashMap::new(), BidWeights { bid: 1.0, confidence: 0.0, reputation: 0.0 }, false);
        let award = award_first_price(&scored);
        assert_eq!(award.winner_handle, Some("b".to_string()));
        assert_eq!(award.effective_price, Some(30.0));
    }
}
