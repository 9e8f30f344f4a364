//! GraphQL documents and typed payloads for the four operations the
//! console consumes.

use crate::model::{
    Bet,
    PlacedBet,
    User,
    WithdrawReceipt,
};
use serde::{
    Deserialize,
    Serialize,
};

pub const GET_USER: &str = r#"query GetUser {
  user {
    id
    balance
    bets {
      id
      amount
      diceNumber
      result
      timestamp
    }
    message
  }
}"#;

pub const GET_BETS: &str = r#"query GetBets {
  bets {
    id
    amount
    diceNumber
    result
    timestamp
  }
}"#;

pub const PLACE_BET: &str = r#"mutation PlaceBet($amount: Int!, $diceNumber: Int!) {
  placeBet(amount: $amount, diceNumber: $diceNumber) {
    id
    amount
    diceNumber
    result
    timestamp
    message
  }
}"#;

pub const WITHDRAW: &str = r#"mutation Withdraw {
  withdraw {
    id
    balance
    bets {
      id
      amount
      diceNumber
      result
      timestamp
    }
    message
  }
}"#;

/// A typed GraphQL operation: its document, name and the shape of its
/// `data` object.
pub trait Operation {
    const NAME: &'static str;
    const DOCUMENT: &'static str;
    type Data: for<'de> Deserialize<'de>;
    type Output;

    fn output(data: Self::Data) -> Self::Output;
}

pub struct GetUser;

#[derive(Deserialize)]
pub struct GetUserData {
    user: User,
}

impl Operation for GetUser {
    const NAME: &'static str = "GetUser";
    const DOCUMENT: &'static str = GET_USER;
    type Data = GetUserData;
    type Output = User;

    fn output(data: GetUserData) -> User {
        data.user
    }
}

pub struct GetBets;

#[derive(Deserialize)]
pub struct GetBetsData {
    bets: Vec<Bet>,
}

impl Operation for GetBets {
    const NAME: &'static str = "GetBets";
    const DOCUMENT: &'static str = GET_BETS;
    type Data = GetBetsData;
    type Output = Vec<Bet>;

    fn output(data: GetBetsData) -> Vec<Bet> {
        data.bets
    }
}

pub struct PlaceBet;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceBetData {
    place_bet: PlacedBet,
}

impl Operation for PlaceBet {
    const NAME: &'static str = "PlaceBet";
    const DOCUMENT: &'static str = PLACE_BET;
    type Data = PlaceBetData;
    type Output = PlacedBet;

    fn output(data: PlaceBetData) -> PlacedBet {
        data.place_bet
    }
}

pub struct Withdraw;

#[derive(Deserialize)]
pub struct WithdrawData {
    withdraw: WithdrawReceipt,
}

impl Operation for Withdraw {
    const NAME: &'static str = "Withdraw";
    const DOCUMENT: &'static str = WITHDRAW;
    type Data = WithdrawData;
    type Output = WithdrawReceipt;

    fn output(data: WithdrawData) -> WithdrawReceipt {
        data.withdraw
    }
}

/// Variables for `PlaceBet`. `None` is a form value that did not parse as
/// an integer; it is sent as `null` and left for the server to reject.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BetVariables {
    pub amount: Option<i64>,
    pub dice_number: Option<i64>,
}
