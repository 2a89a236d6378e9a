//! Team and Action vertices.

use indexmap::IndexSet;

use tangle_foundation::{ActionId, EdgeId};

/// A routing vertex: owns its outgoing edges, tracks incoming ones.
///
/// Outgoing order is insertion order and decides ties between equal bids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Team {
    pub(crate) outgoing: IndexSet<EdgeId>,
    pub(crate) incoming: IndexSet<EdgeId>,
}

impl Team {
    pub fn outgoing(&self) -> &IndexSet<EdgeId> {
        &self.outgoing
    }

    pub fn incoming(&self) -> &IndexSet<EdgeId> {
        &self.incoming
    }
}

/// A terminal vertex carrying the action returned by a decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub(crate) action_id: ActionId,
    pub(crate) incoming: IndexSet<EdgeId>,
}

impl Action {
    pub fn action_id(&self) -> ActionId {
        self.action_id
    }

    pub fn incoming(&self) -> &IndexSet<EdgeId> {
        &self.incoming
    }
}

/// Vertex kinds are closed: a decision graph only has Teams and Actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Vertex {
    Team(Team),
    Action(Action),
}

impl Vertex {
    pub fn is_team(&self) -> bool {
        matches!(self, Vertex::Team(_))
    }

    pub fn is_action(&self) -> bool {
        matches!(self, Vertex::Action(_))
    }

    pub fn as_team(&self) -> Option<&Team> {
        match self {
            Vertex::Team(team) => Some(team),
            Vertex::Action(_) => None,
        }
    }

    pub fn action_id(&self) -> Option<ActionId> {
        match self {
            Vertex::Team(_) => None,
            Vertex::Action(action) => Some(action.action_id),
        }
    }

    /// Outgoing edges; always empty for an Action.
    pub fn outgoing(&self) -> impl Iterator<Item = EdgeId> + '_ {
        self.as_team()
            .into_iter()
            .flat_map(|team| team.outgoing.iter().copied())
    }

    pub fn nb_outgoing(&self) -> usize {
        self.as_team().map_or(0, |team| team.outgoing.len())
    }

    pub fn incoming(&self) -> &IndexSet<EdgeId> {
        match self {
            Vertex::Team(team) => &team.incoming,
            Vertex::Action(action) => &action.incoming,
        }
    }

    pub(crate) fn incoming_mut(&mut self) -> &mut IndexSet<EdgeId> {
        match self {
            Vertex::Team(team) => &mut team.incoming,
            Vertex::Action(action) => &mut action.incoming,
        }
    }

    /// No incoming and no outgoing edge.
    pub fn is_orphan(&self) -> bool {
        self.incoming().is_empty() && self.nb_outgoing() == 0
    }
}
