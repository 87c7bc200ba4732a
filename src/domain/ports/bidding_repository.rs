//! Task bidding repository port.

use async_trait::async_trait;

use crate::domain::errors::FleetResult;
use crate::domain::models::{BidStatus, TaskBid};

#[async_trait]
pub trait BiddingRepository: Send + Sync {
    /// Upserts on `(task_id, bidder_handle)` while the existing row (if
    /// any) is still `pending`, rather than inserting a duplicate row for
    /// a repeat bid.
    async fn submit_bid(&self, bid: &TaskBid) -> FleetResult<()>;

    async fn get_bid(&self, id: &str) -> FleetResult<Option<TaskBid>>;

    /// Bids for `task_id`, optionally filtered to one status, ordered by
    /// `created_at` ascending.
    async fn list_bids(&self, task_id: &str, status: Option<BidStatus>) -> FleetResult<Vec<TaskBid>>;

    /// Atomically sets `winning_bid_id` to `accepted` and every other
    /// `pending` bid for `task_id` to `rejected`. No prior-`accepted` bid
    /// for the task is disturbed.
    async fn accept_bid(&self, task_id: &str, winning_bid_id: &str) -> FleetResult<()>;
}
