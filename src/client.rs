use crate::{
    error::{
        ClientError,
        Result,
    },
    graphql::{
        GraphqlRequest,
        Transport,
        operations::{
            BetVariables,
            GetBets,
            GetUser,
            Operation,
            PlaceBet,
            Withdraw,
        },
    },
    model::{
        Bet,
        PlacedBet,
        User,
        WithdrawReceipt,
    },
};
use serde_json::{
    Value,
    json,
};
use std::{
    sync::{
        Mutex,
        MutexGuard,
    },
    time::Duration,
};
use tokio::{
    sync::watch,
    time,
};
use tracing::{
    info,
    warn,
};

/// Cached view of one query: `{loading, error, data}`.
///
/// A failed refetch keeps the previously fetched data alongside the error.
#[derive(Clone, Debug, PartialEq)]
pub struct QueryState<D> {
    pub loading: bool,
    pub error: Option<String>,
    pub data: Option<D>,
}

impl<D> Default for QueryState<D> {
    fn default() -> Self {
        Self {
            loading: false,
            error: None,
            data: None,
        }
    }
}

impl<D> QueryState<D> {
    fn begin(&mut self) {
        self.loading = true;
    }

    fn settle(&mut self, result: &Result<D>)
    where
        D: Clone,
    {
        self.loading = false;
        match result {
            Ok(data) => {
                self.data = Some(data.clone());
                self.error = None;
            }
            Err(err) => {
                self.error = Some(err.to_string());
            }
        }
    }
}

#[derive(Debug, Default)]
struct QueryCache {
    user: QueryState<User>,
    bets: QueryState<Vec<Bet>>,
}

/// GraphQL client with a per-operation query cache.
///
/// Queries write the cache and bump a revision counter observed through
/// [`RemoteDataClient::subscribe`]. Mutations never touch the cache; fresh
/// state only arrives through an explicit refetch.
pub struct RemoteDataClient<T> {
    transport: T,
    timeout: Duration,
    cache: Mutex<QueryCache>,
    revision: watch::Sender<u64>,
}

impl<T: Transport> RemoteDataClient<T> {
    pub fn new(transport: T, timeout: Duration) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            transport,
            timeout,
            cache: Mutex::new(QueryCache::default()),
            revision,
        }
    }

    pub fn user(&self) -> QueryState<User> {
        self.cache().user.clone()
    }

    pub fn bets(&self) -> QueryState<Vec<Bet>> {
        self.cache().bets.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    pub async fn fetch_user(&self) -> Result<()> {
        self.update(|cache| cache.user.begin());
        let result = self.run::<GetUser>(json!({})).await;
        self.update(|cache| cache.user.settle(&result));
        result.map(|_| ())
    }

    pub async fn fetch_bets(&self) -> Result<()> {
        self.update(|cache| cache.bets.begin());
        let result = self.run::<GetBets>(json!({})).await;
        self.update(|cache| cache.bets.settle(&result));
        result.map(|_| ())
    }

    /// Re-issues GetUser and GetBets together and applies both results in a
    /// single cache update.
    pub async fn refetch_all(&self) -> Result<()> {
        self.update(|cache| {
            cache.user.begin();
            cache.bets.begin();
        });
        let (user, bets) =
            tokio::join!(self.run::<GetUser>(json!({})), self.run::<GetBets>(json!({})));
        self.update(|cache| {
            cache.user.settle(&user);
            cache.bets.settle(&bets);
        });
        user?;
        bets?;
        Ok(())
    }

    pub async fn place_bet(&self, variables: BetVariables) -> Result<PlacedBet> {
        let variables = serde_json::to_value(variables)
            .map_err(|source| ClientError::Decode {
                operation: PlaceBet::NAME,
                source,
            })?;
        self.run::<PlaceBet>(variables).await
    }

    pub async fn withdraw(&self) -> Result<WithdrawReceipt> {
        self.run::<Withdraw>(json!({})).await
    }

    async fn run<O: Operation>(&self, variables: Value) -> Result<O::Output> {
        let request = GraphqlRequest {
            query: O::DOCUMENT,
            operation_name: O::NAME,
            variables,
        };
        info!(operation = O::NAME, "executing graphql operation");
        let outcome = time::timeout(self.timeout, self.transport.execute(request))
            .await
            .map_err(|_| ClientError::Timeout(self.timeout))
            .and_then(|inner| inner)
            .and_then(|data| {
                serde_json::from_value::<O::Data>(data).map_err(|source| {
                    ClientError::Decode {
                        operation: O::NAME,
                        source,
                    }
                })
            });
        match outcome {
            Ok(data) => Ok(O::output(data)),
            Err(err) => {
                warn!(operation = O::NAME, error = %err, "graphql operation failed");
                Err(err)
            }
        }
    }

    fn update(&self, apply: impl FnOnce(&mut QueryCache)) {
        {
            let mut cache = self.cache();
            apply(&mut *cache);
        }
        self.revision.send_modify(|rev| *rev = rev.wrapping_add(1));
    }

    fn cache(&self) -> MutexGuard<'_, QueryCache> {
        self.cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[allow(non_snake_case)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        model::BetResult,
        test_helpers::{
            FakeTransport,
            Reply,
            bet_json,
            placed_bet_json,
            user_json,
        },
    };

    fn client(fake: &FakeTransport) -> RemoteDataClient<FakeTransport> {
        RemoteDataClient::new(fake.clone(), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn fetch_user__writes_cache_and_bumps_revision() {
        // given
        let fake = FakeTransport::new();
        fake.always("GetUser", Reply::data(json!({"user": user_json(100, vec![])})));
        let client = client(&fake);
        let rx = client.subscribe();
        let before = *rx.borrow();

        // when
        client.fetch_user().await.unwrap();

        // then
        let state = client.user();
        assert!(!state.loading);
        assert_eq!(state.error, None);
        assert_eq!(state.data.unwrap().balance, 100);
        assert!(*rx.borrow() > before);
    }

    #[tokio::test]
    async fn fetch_user__records_error_without_data() {
        // given
        let fake = FakeTransport::new();
        fake.always("GetUser", Reply::errors(["Not authenticated"]));
        let client = client(&fake);

        // when
        let err = client.fetch_user().await.unwrap_err();

        // then
        assert_eq!(err.to_string(), "Not authenticated");
        let state = client.user();
        assert_eq!(state.error.as_deref(), Some("Not authenticated"));
        assert_eq!(state.data, None);
    }

    #[tokio::test]
    async fn refetch_all__issues_each_query_once_and_keeps_stale_data_on_failure() {
        // given
        let fake = FakeTransport::new();
        fake.push("GetUser", Reply::data(json!({"user": user_json(100, vec![])})));
        fake.push("GetBets", Reply::data(json!({"bets": [bet_json("b1", "win")]})));
        let client = client(&fake);
        client.fetch_user().await.unwrap();
        client.fetch_bets().await.unwrap();
        fake.clear_calls();
        fake.push("GetUser", Reply::errors(["backend down"]));
        fake.push("GetBets", Reply::data(json!({"bets": []})));

        // when
        let result = client.refetch_all().await;

        // then
        assert!(result.is_err());
        assert_eq!(fake.calls_for("GetUser"), 1);
        assert_eq!(fake.calls_for("GetBets"), 1);
        let user = client.user();
        assert_eq!(user.data.unwrap().balance, 100);
        assert_eq!(user.error.as_deref(), Some("backend down"));
        assert_eq!(client.bets().data, Some(vec![]));
    }

    #[tokio::test]
    async fn place_bet__sends_variables_and_leaves_cache_alone() {
        // given
        let fake = FakeTransport::new();
        fake.push("PlaceBet", Reply::data(json!({"placeBet": placed_bet_json("lose", None)})));
        let client = client(&fake);
        let rx = client.subscribe();
        let before = *rx.borrow();

        // when
        let placed = client
            .place_bet(BetVariables {
                amount: Some(10),
                dice_number: Some(4),
            })
            .await
            .unwrap();

        // then
        assert_eq!(placed.result, BetResult::Lose);
        let sent = fake.calls();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].variables, json!({"amount": 10, "diceNumber": 4}));
        assert_eq!(*rx.borrow(), before);
        assert_eq!(client.user(), QueryState::default());
    }

    #[tokio::test]
    async fn withdraw__reports_decode_errors_separately_from_transport() {
        // given
        let fake = FakeTransport::new();
        fake.push("Withdraw", Reply::data(json!({"withdraw": {"balance": "lots"}})));
        let client = client(&fake);

        // when
        let err = client.withdraw().await.unwrap_err();

        // then
        assert!(matches!(err, ClientError::Decode { operation: "Withdraw", .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn run__times_out_hung_requests() {
        // given
        let fake = FakeTransport::new();
        fake.push("PlaceBet", Reply::Hang);
        let client = RemoteDataClient::new(fake.clone(), Duration::from_secs(3));

        // when
        let err = client.place_bet(BetVariables::default()).await.unwrap_err();

        // then
        assert!(matches!(err, ClientError::Timeout(d) if d == Duration::from_secs(3)));
    }
}
