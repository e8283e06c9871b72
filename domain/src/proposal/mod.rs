//! Proposal subdomain
//!
//! A submitted proposal, its structured extraction, and the validation and
//! tagging rules applied in Stage 1.

pub mod entities;
pub mod extraction;
pub mod similar;

pub use entities::{
    BudgetItem, Milestone, Proposal, ProposalDetails, ProposalStatus, TeamMember, parse_amount,
};
pub use extraction::{ValidationReport, extract_json_block, parse_details};
pub use similar::{SimilarProposal, rank_similar};
