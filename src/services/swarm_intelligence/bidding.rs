//! Bidding: weighted-score (first-price) and Vickrey (second-price)
//! awarding over bids submitted directly against an opaque task id.

use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use crate::domain::errors::{FleetError, FleetResult};
use crate::domain::models::{
    award_first_price, award_second_price, evaluate_bids, AuctionAward, BidStatus, BidWeights, ScoredBid, TaskBid,
};
use crate::domain::ports::{BiddingRepository, Clock};
use crate::services::push_hub::{Event, PushHub, Subject};

pub struct BiddingService<B, C>
where
    B: BiddingRepository + 'static,
    C: Clock + 'static,
{
    repo: Arc<B>,
    clock: Arc<C>,
    push_hub: PushHub,
}

impl<B, C> BiddingService<B, C>
where
    B: BiddingRepository + 'static,
    C: Clock + 'static,
{
    pub fn new(repo: Arc<B>, clock: Arc<C>, push_hub: PushHub) -> Self {
        Self { repo, clock, push_hub }
    }

    /// Records `bidder_handle`'s bid against `task_id`. A repeat bid while
    /// the bidder's prior bid on the same task is still pending upserts in
    /// place rather than accumulating duplicates.
    pub async fn submit_bid(&self, swarm_id: &str, task_id: &str, bidder_handle: &str, amount: f64, confidence: f64) -> FleetResult<TaskBid> {
        let now = self.clock.now_ms();
        let bid = TaskBid::new(Uuid::new_v4().to_string(), task_id.to_string(), bidder_handle.to_string(), amount, confidence, now);
        self.repo.submit_bid(&bid).await?;
        self.push_hub
            .publish(Subject::Swarm(swarm_id.to_string()), Event::BiddingBid { task_id: task_id.to_string(), bidder_handle: bidder_handle.to_string() })
            .await;
        Ok(bid)
    }

    pub async fn list_bids(&self, task_id: &str, status: Option<BidStatus>) -> FleetResult<Vec<TaskBid>> {
        self.repo.list_bids(task_id, status).await
    }

    /// Scores every pending bid on `task_id` per `evaluate_bids`, without
    /// accepting anything.
    pub async fn evaluate_bids(
        &self,
        task_id: &str,
        reputations: &HashMap<String, f64>,
        weights: BidWeights,
        prefer_lower_bids: bool,
    ) -> FleetResult<Vec<ScoredBid>> {
        let bids = self.repo.list_bids(task_id, Some(BidStatus::Pending)).await?;
        Ok(evaluate_bids(&bids, reputations, weights, prefer_lower_bids))
    }

    /// Accepts `bid_id` for `task_id` and rejects every other pending bid
    /// for that task, in one transaction.
    pub async fn accept_bid(&self, swarm_id: &str, task_id: &str, bid_id: &str) -> FleetResult<()> {
        let bid = self
            .repo
            .get_bid(bid_id)
            .await?
            .ok_or_else(|| FleetError::NotFound(format!("bid '{bid_id}' not found")))?;
        if bid.status != BidStatus::Pending {
            return Err(FleetError::InvariantViolation(format!("bid '{bid_id}' is already {}", bid.status.as_str())));
        }
        self.repo.accept_bid(task_id, bid_id).await?;
        self.push_hub
            .publish(Subject::Swarm(swarm_id.to_string()), Event::BiddingAccepted { task_id: task_id.to_string(), bidder_handle: bid.bidder_handle })
            .await;
        Ok(())
    }

    /// First-price auction: ranks pending bids by `evaluate_bids` and
    /// accepts the top-scored one.
    pub async fn run_first_price_auction(
        &self,
        swarm_id: &str,
        task_id: &str,
        reputations: &HashMap<String, f64>,
        weights: BidWeights,
        prefer_lower_bids: bool,
    ) -> FleetResult<AuctionAward> {
        let scored = self.evaluate_bids(task_id, reputations, weights, prefer_lower_bids).await?;
        let award = award_first_price(&scored);
        self.finish_auction(swarm_id, task_id, &scored.into_iter().map(|s| s.bid).collect::<Vec<_>>(), &award).await?;
        Ok(award)
    }

    /// Second-price (Vickrey) auction: the highest raw bid wins, pays the
    /// second-highest amount. Stored bid amounts are never rewritten.
    pub async fn run_second_price_auction(&self, swarm_id: &str, task_id: &str) -> FleetResult<AuctionAward> {
        let bids = self.repo.list_bids(task_id, Some(BidStatus::Pending)).await?;
        let award = award_second_price(&bids);
        self.finish_auction(swarm_id, task_id, &bids, &award).await?;
        Ok(award)
    }

    async fn finish_auction(&self, swarm_id: &str, task_id: &str, bids: &[TaskBid], award: &AuctionAward) -> FleetResult<()> {
        if let Some(winner_handle) = &award.winner_handle {
            let Some(winning_bid) = bids.iter().find(|b| &b.bidder_handle == winner_handle) else {
                return Err(FleetError::Internal("auction winner not found among evaluated bids".into()));
            };
            self.accept_bid(swarm_id, task_id, &winning_bid.id).await?;
        }
        self.push_hub
            .publish(
                Subject::Swarm(swarm_id.to_string()),
                Event::BiddingAuctionComplete { task_id: task_id.to_string(), winner_handle: award.winner_handle.clone() },
            )
            .await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::clock::ManualClock;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeBiddingRepo {
        bids: Mutex<Vec<TaskBid>>,
    }

    #[async_trait]
    impl BiddingRepository for FakeBiddingRepo {
        async fn submit_bid(&self, bid: &TaskBid) -> FleetResult<()> {
            let mut guard = self.bids.lock().unwrap();
            if let Some(existing) = guard
                .iter_mut()
                .find(|b| b.task_id == bid.task_id && b.bidder_handle == bid.bidder_handle && b.status == BidStatus::Pending)
            {
                *existing = bid.clone();
            } else {
                guard.push(bid.clone());
            }
            Ok(())
        }
        async fn get_bid(&self, id: &str) -> FleetResult<Option<TaskBid>> {
            Ok(self.bids.lock().unwrap().iter().find(|b| b.id == id).cloned())
        }
        async fn list_bids(&self, task_id: &str, status: Option<BidStatus>) -> FleetResult<Vec<TaskBid>> {
            Ok(self
                .bids
                .lock()
                .unwrap()
                .iter()
                .filter(|b| b.task_id == task_id && status.map(|s| s == b.status).unwrap_or(true))
                .cloned()
                .collect())
        }
        async fn accept_bid(&self, task_id: &str, winning_bid_id: &str) -> FleetResult<()> {
            let mut guard = self.bids.lock().unwrap();
            for bid in guard.iter_mut().filter(|b| b.task_id == task_id) {
                if bid.id == winning_bid_id {
                    bid.status = BidStatus::Accepted;
                } else if bid.status == BidStatus::Pending {
                    bid.status = BidStatus::Rejected;
                }
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn second_price_auction_awards_highest_bidder_second_highest_price() {
        let repo = Arc::new(FakeBiddingRepo::default());
        let clock = Arc::new(ManualClock::new(0));
        let service = BiddingService::new(repo, clock, PushHub::default());

        service.submit_bid("s1", "t1", "a", 10.0, 0.5).await.unwrap();
        service.submit_bid("s1", "t1", "b", 8.0, 0.5).await.unwrap();
        service.submit_bid("s1", "t1", "c", 6.0, 0.5).await.unwrap();

        let award = service.run_second_price_auction("s1", "t1").await.unwrap();
        assert_eq!(award.winner_handle, Some("a".to_string()));
        assert_eq!(award.winning_bid_amount, Some(10.0));
        assert_eq!(award.effective_price, Some(8.0));

        let accepted = service.list_bids("t1", Some(BidStatus::Accepted)).await.unwrap();
        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0].bidder_handle, "a");
        assert_eq!(accepted[0].amount, 10.0, "stored amount is not rewritten to the effective price");

        let rejected = service.list_bids("t1", Some(BidStatus::Rejected)).await.unwrap();
        assert_eq!(rejected.len(), 2);
    }

    #[tokio::test]
    async fn accepting_a_non_pending_bid_is_rejected() {
        let repo = Arc::new(FakeBiddingRepo::default());
        let clock = Arc::new(ManualClock::new(0));
        let service = BiddingService::new(repo, clock, PushHub::default());

        let bid = service.submit_bid("s1", "t1", "a", 10.0, 0.5).await.unwrap();
        service.accept_bid("s1", "t1", &bid.id).await.unwrap();

        let err = service.accept_bid("s1", "t1", &bid.id).await.unwrap_err();
        assert!(matches!(err, FleetError::InvariantViolation(_)));
    }

    #[tokio::test]
    async fn auction_with_no_bids_awards_nobody() {
        let repo = Arc::new(FakeBiddingRepo::default());
        let clock = Arc::new(ManualClock::new(0));
        let service = BiddingService::new(repo, clock, PushHub::default());

        let award = service.run_second_price_auction("s1", "t1").await.unwrap();
        assert!(award.winner_handle.is_none());
    }
}
