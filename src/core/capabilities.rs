/// External capabilities the surrounding system may plug in. The engine core
/// never calls these on its own.

use thiserror::Error;

use crate::core::ledger::LieProfile;
use crate::schema::fragment::FragmentDefinition;
use crate::schema::ids::{PlayerId, StoryId, TokenId};
use crate::schema::player::PlayerProgress;
use crate::schema::story::{Chapter, Story, StoryNode};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CapabilityError {
    #[error("text generation unavailable: {0}")]
    TextUnavailable(String),
    #[error("minting failed: {0}")]
    MintFailed(String),
}

/// The slice of a player a text generator may personalise with.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerProfile<'a> {
    pub lie_profile: LieProfile,
    pub current_chapter: Chapter,
    pub completed_stories: &'a [StoryId],
}

impl<'a> From<&'a PlayerProgress> for PlayerProfile<'a> {
    fn from(player: &'a PlayerProgress) -> Self {
        Self {
            lie_profile: player.lie_profile,
            current_chapter: player.current_chapter,
            completed_stories: &player.completed_stories,
        }
    }
}

/// Supplies text for `dynamic` nodes.
pub trait NarrativeTextSource {
    fn generate(
        &self,
        node: &StoryNode,
        profile: &PlayerProfile<'_>,
        story: &Story,
    ) -> Result<String, CapabilityError>;
}

impl<F> NarrativeTextSource for F
where
    F: Fn(&StoryNode, &PlayerProfile<'_>, &Story) -> Result<String, CapabilityError>,
{
    fn generate(
        &self,
        node: &StoryNode,
        profile: &PlayerProfile<'_>,
        story: &Story,
    ) -> Result<String, CapabilityError> {
        self(node, profile, story)
    }
}

/// Mints an on-chain token for a fragment a player owns.
pub trait FragmentMinter {
    fn mint(&self, owner: &PlayerId, fragment: &FragmentDefinition) -> Result<TokenId, CapabilityError>;
}

impl<F> FragmentMinter for F
where
    F: Fn(&PlayerId, &FragmentDefinition) -> Result<TokenId, CapabilityError>,
{
    fn mint(&self, owner: &PlayerId, fragment: &FragmentDefinition) -> Result<TokenId, CapabilityError> {
        self(owner, fragment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closures_act_as_capabilities() {
        let fragment: FragmentDefinition =
            ron::from_str(r#"(id: "genesis-truth", name: "Genesis Truth")"#).unwrap();
        let minter = |owner: &PlayerId, fragment: &FragmentDefinition| -> Result<TokenId, CapabilityError> {
            Ok(TokenId::new(format!("{}:{}", owner, fragment.id)))
        };
        let token = FragmentMinter::mint(&minter, &PlayerId::from("neo"), &fragment).unwrap();
        assert_eq!(token.as_str(), "neo:genesis-truth");

        let offline = |_: &PlayerId, _: &FragmentDefinition| -> Result<TokenId, CapabilityError> {
            Err(CapabilityError::MintFailed("chain offline".into()))
        };
        assert_eq!(
            offline.mint(&PlayerId::from("neo"), &fragment),
            Err(CapabilityError::MintFailed("chain offline".into()))
        );
    }
}
