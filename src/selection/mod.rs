pub mod eligibility;
pub mod ranking;
pub mod request;
pub mod resolver;
pub mod sampler;
pub mod weights;

use std::collections::BTreeSet;

use rand::Rng;
use tracing::{debug, info, warn};

use crate::config::FeedConfig;
use crate::profile::SectorKind;
use crate::store::{FeedStore, StoreError};
use crate::types::feed_bundle::{AssemblyStats, FeedError, FeedResult, Termination};
use crate::types::identifiers::{PostId, UserId};
pub use eligibility::{EligibilityFilter, Rejection, Requester};
pub use ranking::{Candidate, CreatorRanking, Ranker, TagRanking};
pub use request::{parse_already_selected, CancellationFlag, FeedRequest};
pub use resolver::{CandidateResolver, CreatorResolver, Resolution, ResolveContext, TagResolver};
pub use sampler::{Exhausted, SectorSampler};
pub use weights::{CumulativeWeightTable, SectorEntry};

enum AssemblyState {
	Sampling,
	Resolving(SectorEntry),
	Done(Termination),
}

/// Drives draw/resolve rounds until the feed is full or cannot be filled.
///
/// Holds no per-request state; share one instance across threads.
pub struct FeedAssembler<T, C> {
	tag: T,
	creator: C,
	config: FeedConfig,
}

impl Default for FeedAssembler<TagResolver, CreatorResolver> {
	fn default() -> Self {
		Self {
			tag: TagResolver,
			creator: CreatorResolver,
			config: FeedConfig::v0(),
		}
	}
}

impl FeedAssembler<TagResolver, CreatorResolver> {
	pub fn with_config(config: FeedConfig) -> Self {
		Self {
			config,
			..Self::default()
		}
	}
}

impl<T, C> FeedAssembler<T, C>
where
	T: CandidateResolver,
	C: CandidateResolver,
{
	pub fn new(tag: T, creator: C, config: FeedConfig) -> Self {
		Self { tag, creator, config }
	}

	pub fn config(&self) -> &FeedConfig {
		&self.config
	}

	pub fn assemble<S, R>(
		&self,
		store: &S,
		request: &FeedRequest,
		rng: &mut R,
	) -> Result<FeedResult, FeedError>
	where
		S: FeedStore + ?Sized,
		R: Rng + ?Sized,
	{
		// 0. Load the profile; every failure here is fatal
		let profile = store
			.fetch_user_profile(&request.requester_id)
			.map_err(|err| profile_error(&request.requester_id, err))?;
		let profile_version = profile.version();
		let requester = Requester::from_profile(&profile);

		// 1. Sampling table
		let table = CumulativeWeightTable::from_profile(&profile.signals)?;
		let mut sampler = SectorSampler::new(table);

		let requested = request.requested_count;
		let retry_bound = self.config.retry_bound(requested);

		let mut selected: Vec<PostId> = Vec::with_capacity(requested);
		let mut excluded_ids: BTreeSet<PostId> = request.already_selected.iter().cloned().collect();
		let mut blacklist: BTreeSet<String> = BTreeSet::new();
		let mut draws = 0;
		let mut not_found = 0;

		// 2. Draw/resolve loop
		let mut state = if requested == 0 {
			AssemblyState::Done(Termination::Filled)
		} else {
			AssemblyState::Sampling
		};

		let termination = loop {
			state = match state {
				AssemblyState::Sampling => {
					if request.is_cancelled() {
						AssemblyState::Done(Termination::Cancelled)
					} else if request.is_past_deadline() {
						AssemblyState::Done(Termination::DeadlineExceeded)
					} else {
						match sampler.draw(&blacklist, rng) {
							Ok(entry) => {
								draws += 1;
								debug!(label = %entry.label, kind = ?entry.kind, "sector drawn");
								AssemblyState::Resolving(entry)
							}
							Err(Exhausted::NoWeight) => AssemblyState::Done(Termination::SectorsExhausted),
						}
					}
				}
				AssemblyState::Resolving(entry) => {
					let resolution = {
						let ctx = ResolveContext {
							requester: &requester,
							already_selected: &excluded_ids,
							config: &self.config,
						};
						match entry.kind {
							SectorKind::Tag => self.tag.resolve(store, &entry, &ctx, rng)?,
							SectorKind::Creator => self.creator.resolve(store, &entry, &ctx, rng)?,
						}
					};
					debug!(label = %entry.label, ?resolution, "sector resolved");

					match resolution {
						Resolution::Found(post_id) => {
							if excluded_ids.insert(post_id.clone()) {
								selected.push(post_id);
							} else {
								// The filter should have removed it
								warn!(post = %post_id, label = %entry.label, "resolver returned an already selected post");
								not_found += 1;
							}
						}
						Resolution::Exhausted => {
							blacklist.insert(entry.label);
						}
						Resolution::NotFound => not_found += 1,
					}

					if selected.len() >= requested {
						AssemblyState::Done(Termination::Filled)
					} else if not_found > retry_bound {
						AssemblyState::Done(Termination::RetryBoundReached)
					} else {
						AssemblyState::Sampling
					}
				}
				AssemblyState::Done(termination) => break termination,
			};
		};

		let truncated = selected.len() < requested;
		info!(
			requester = %request.requester_id,
			requested,
			selected = selected.len(),
			blacklisted = blacklist.len(),
			draws,
			not_found,
			?termination,
			"feed assembled"
		);

		Ok(FeedResult {
			selected_post_ids: selected,
			blacklist,
			truncated,
			profile_version,
			stats: AssemblyStats {
				draws,
				not_found,
				termination,
			},
		})
	}
}

fn profile_error(id: &UserId, err: StoreError) -> FeedError {
	match err {
		StoreError::UserNotFound(_) => FeedError::UserNotFound(id.clone()),
		StoreError::Unavailable(reason) => FeedError::StoreUnavailable(reason),
		StoreError::Malformed(reason) => {
			// Nothing to build a sampling table from
			warn!(requester = %id, %reason, "profile could not be decoded");
			FeedError::UserNotFound(id.clone())
		}
	}
}
