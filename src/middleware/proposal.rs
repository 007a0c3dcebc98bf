//! Governance requests, votes and proposals
//!
//! A governance request is an ordinary contract call addressed to the
//! reserved governance module. Its meaning travels in reserved argument
//! keys, which are parsed once at the boundary into [`GovernanceRequest`].

use crate::core::amount::{decimal, parse_amount};
use crate::core::{Amount, Args, InvokeRequest, InvokeRpcRequest};
use crate::crypto::hash_json;
use crate::middleware::error::{MiddlewareError, MiddlewareResult};
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Argument key: action to perform
pub const ARG_ACTION: &str = "middle_action";
/// Argument key: contract for `invoke`
pub const ARG_CONTRACT: &str = "middle_contract";
/// Argument key: method for `invoke`
pub const ARG_METHOD: &str = "middle_method";
/// Argument key: proposal identifier
pub const ARG_UUID: &str = "middle_uuid";
/// Argument key: stake amount (informational, the call amount is used)
pub const ARG_AMOUNT: &str = "middle_amount";
/// Argument key: middleware name for registry actions
pub const ARG_NAME: &str = "middle_name";
/// Argument key: registry position for `put`/`swap`
pub const ARG_INDEX: &str = "middle_index";
/// Argument key: virtual machine module for `invoke`
pub const ARG_MODULE: &str = "middle_module";

/// Governance action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Read the registry
    Get,
    /// Propose inserting a middleware
    Put,
    /// Propose moving a middleware
    Swap,
    /// Propose removing a middleware
    Del,
    /// Back an existing proposal with stake
    Vote,
    /// Propose a privileged contract invocation
    Invoke,
}

impl Action {
    /// Wire name of the action
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Get => "get",
            Action::Put => "put",
            Action::Swap => "swap",
            Action::Del => "del",
            Action::Vote => "vote",
            Action::Invoke => "invoke",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = MiddlewareError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "get" => Ok(Action::Get),
            "put" => Ok(Action::Put),
            "swap" => Ok(Action::Swap),
            "del" => Ok(Action::Del),
            "vote" => Ok(Action::Vote),
            "invoke" => Ok(Action::Invoke),
            other => Err(MiddlewareError::UnknownAction(other.to_string())),
        }
    }
}

/// A stake-weighted vote. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    /// Identities that signed the voting transaction
    pub auth: Vec<String>,
    /// Voter address; refunds are credited here
    pub address: String,
    /// Stake carried by the vote
    #[serde(with = "decimal")]
    pub amount: Amount,
    /// Transaction that carried the vote
    pub txid: String,
}

/// A typed governance request, parsed from the reserved argument keys
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GovernanceRequest {
    pub vote: Vote,
    pub action: Action,
    pub module: String,
    pub contract: String,
    pub method: String,
    pub uuid: String,
    pub name: String,
    pub index: String,
    /// Full argument mapping, reserved keys included
    pub args: Args,
}

fn text_arg(args: &Args, key: &str) -> String {
    args.get(key)
        .map(|v| String::from_utf8_lossy(v).into_owned())
        .unwrap_or_default()
}

impl GovernanceRequest {
    /// Parse the governance call `request` carried by `rpc`.
    ///
    /// The stake is the value transferred with the call; an empty amount
    /// counts as zero. The initiator is the voter and must be set, since
    /// refunds are paid to it.
    pub fn parse(rpc: &InvokeRpcRequest, request: &InvokeRequest) -> MiddlewareResult<Self> {
        if rpc.initiator.is_empty() {
            return Err(MiddlewareError::EmptyInitiator);
        }
        let amount = parse_amount(&request.amount)
            .ok_or_else(|| MiddlewareError::InvalidAmount(request.amount.clone()))?;
        let action = text_arg(&request.args, ARG_ACTION).parse::<Action>()?;

        Ok(Self {
            vote: Vote {
                auth: rpc.auth_require.clone(),
                address: rpc.initiator.clone(),
                amount,
                txid: rpc.tx_id.clone(),
            },
            action,
            module: text_arg(&request.args, ARG_MODULE),
            contract: text_arg(&request.args, ARG_CONTRACT),
            method: text_arg(&request.args, ARG_METHOD),
            uuid: text_arg(&request.args, ARG_UUID),
            name: text_arg(&request.args, ARG_NAME),
            index: text_arg(&request.args, ARG_INDEX),
            args: request.args.clone(),
        })
    }

    /// Identifier this request refers to: the client-supplied one, or a
    /// digest of the request's canonical JSON form. The carrying
    /// transaction is left out of the digest, so resubmitting the same
    /// request in a new transaction lands on the same proposal.
    pub fn proposal_id(&self) -> MiddlewareResult<String> {
        if !self.uuid.is_empty() {
            return Ok(self.uuid.clone());
        }

        let vote = Vote {
            txid: String::new(),
            ..self.vote.clone()
        };
        let digest = ProposalDigest {
            vote: &vote,
            action: self.action,
            module: &self.module,
            contract: &self.contract,
            method: &self.method,
            args: &self.args,
            uuid: "",
            votes: &[],
            name: &self.name,
            index: &self.index,
        };
        Ok(hash_json(&digest)?)
    }
}

/// Canonical form hashed into a proposal identifier
#[derive(Serialize)]
struct ProposalDigest<'a> {
    vote: &'a Vote,
    action: Action,
    module: &'a str,
    contract: &'a str,
    method: &'a str,
    args: &'a Args,
    uuid: &'a str,
    votes: &'a [Vote],
    name: &'a str,
    index: &'a str,
}

/// A pending governance action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proposal {
    /// Identifier the proposal is pooled under
    pub uuid: String,
    /// Vote that opened the proposal; its voter is the caller identity of
    /// a privileged invocation
    pub origin: Vote,
    pub action: Action,
    pub module: String,
    pub contract: String,
    pub method: String,
    pub args: Args,
    /// Middleware name for registry actions
    pub name: String,
    /// Registry position for registry actions
    pub index: String,
    /// Votes received so far
    pub votes: Vec<Vote>,
    /// Sum of `votes` stakes
    pub vote_count: Amount,
    /// Stake needed to execute
    pub pass_count: Amount,
}

impl Proposal {
    /// Open a proposal from `request`, with no stake yet
    pub fn open(uuid: String, request: GovernanceRequest, pass_count: Amount) -> Self {
        Self {
            uuid,
            origin: request.vote,
            action: request.action,
            module: request.module,
            contract: request.contract,
            method: request.method,
            args: request.args,
            name: request.name,
            index: request.index,
            votes: Vec::new(),
            vote_count: Amount::zero(),
            pass_count,
        }
    }

    /// Record a vote and add its stake
    pub fn add_vote(&mut self, vote: Vote) {
        self.vote_count += &vote.amount;
        self.votes.push(vote);
    }

    /// True once accumulated stake reaches the threshold
    pub fn is_passed(&self) -> bool {
        self.vote_count >= self.pass_count
    }

    /// Stake still missing, zero once passed
    pub fn need_amount(&self) -> Amount {
        if self.is_passed() {
            Amount::zero()
        } else {
            &self.pass_count - &self.vote_count
        }
    }

    /// Human-readable voting status
    pub fn status(&self) -> String {
        format!(
            "vote_id: {}, pass_amount: {}, count_amount: {}, need_amount: {}",
            self.uuid,
            self.pass_count,
            self.vote_count,
            self.need_amount()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn governance_call(pairs: &[(&str, &str)], amount: &str) -> InvokeRpcRequest {
        let mut request = InvokeRequest::new("middle", "", "").with_amount(amount);
        for (k, v) in pairs {
            request = request.with_arg(k, v.as_bytes());
        }
        InvokeRpcRequest::single("alice", request)
    }

    fn parse(rpc: &InvokeRpcRequest) -> MiddlewareResult<GovernanceRequest> {
        GovernanceRequest::parse(rpc, &rpc.requests[0])
    }

    #[test]
    fn test_parse_fields() {
        let rpc = governance_call(
            &[
                (ARG_ACTION, "put"),
                (ARG_NAME, "audit"),
                (ARG_INDEX, "0"),
                (ARG_UUID, "p-1"),
            ],
            "25",
        );
        let request = parse(&rpc).unwrap();

        assert_eq!(request.action, Action::Put);
        assert_eq!(request.name, "audit");
        assert_eq!(request.index, "0");
        assert_eq!(request.vote.address, "alice");
        assert_eq!(request.vote.amount, Amount::from(25u32));
        assert_eq!(request.proposal_id().unwrap(), "p-1");
        assert_eq!(request.args.len(), 4);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        let rpc = governance_call(&[(ARG_ACTION, "destroy")], "1");
        assert!(matches!(parse(&rpc), Err(MiddlewareError::UnknownAction(a)) if a == "destroy"));

        let rpc = governance_call(&[], "1");
        assert!(matches!(parse(&rpc), Err(MiddlewareError::UnknownAction(_))));

        let rpc = governance_call(&[(ARG_ACTION, "vote")], "-3");
        assert!(matches!(parse(&rpc), Err(MiddlewareError::InvalidAmount(_))));

        let rpc = governance_call(&[(ARG_ACTION, "vote")], "");
        assert_eq!(parse(&rpc).unwrap().vote.amount, Amount::zero());

        let rpc = governance_call(&[(ARG_ACTION, "vote")], "+2");
        assert_eq!(parse(&rpc).unwrap().vote.amount, Amount::from(2u32));

        let rpc = governance_call(&[(ARG_ACTION, "vote")], " 2");
        assert!(matches!(parse(&rpc), Err(MiddlewareError::InvalidAmount(_))));
    }

    #[test]
    fn test_derived_proposal_id_is_stable() {
        let a = parse(&governance_call(&[(ARG_ACTION, "del"), (ARG_NAME, "x")], "1")).unwrap();
        let b = parse(&governance_call(&[(ARG_NAME, "x"), (ARG_ACTION, "del")], "1")).unwrap();
        let c = parse(&governance_call(&[(ARG_ACTION, "del"), (ARG_NAME, "y")], "1")).unwrap();

        let id = a.proposal_id().unwrap();
        assert_eq!(id.len(), 64);
        assert_eq!(id, b.proposal_id().unwrap());
        assert_ne!(id, c.proposal_id().unwrap());
    }

    #[test]
    fn test_derived_id_ignores_carrying_transaction() {
        let mut first = governance_call(&[(ARG_ACTION, "del"), (ARG_NAME, "x")], "1");
        first.tx_id = "tx-1".into();
        let mut second = first.clone();
        second.tx_id = "tx-2".into();

        let a = parse(&first).unwrap();
        let b = parse(&second).unwrap();
        assert_eq!(a.vote.txid, "tx-1");
        assert_eq!(a.proposal_id().unwrap(), b.proposal_id().unwrap());
    }

    #[test]
    fn test_parse_requires_initiator() {
        let mut rpc = governance_call(&[(ARG_ACTION, "vote"), (ARG_UUID, "p")], "1");
        rpc.initiator = String::new();

        let err = parse(&rpc).unwrap_err();
        assert!(matches!(err, MiddlewareError::EmptyInitiator));
        assert!(err.is_malformed());
    }

    #[test]
    fn test_proposal_tally() {
        let request = parse(&governance_call(&[(ARG_ACTION, "put")], "0")).unwrap();
        let mut proposal = Proposal::open("p".into(), request.clone(), Amount::from(10u32));
        assert_eq!(
            proposal.status(),
            "vote_id: p, pass_amount: 10, count_amount: 0, need_amount: 10"
        );

        let mut vote = request.vote.clone();
        vote.amount = Amount::from(4u32);
        proposal.add_vote(vote.clone());
        assert!(!proposal.is_passed());
        assert_eq!(proposal.need_amount(), Amount::from(6u32));

        vote.amount = Amount::from(7u32);
        proposal.add_vote(vote);
        assert!(proposal.is_passed());
        assert_eq!(proposal.vote_count, Amount::from(11u32));
        assert_eq!(proposal.need_amount(), Amount::zero());
    }
}
