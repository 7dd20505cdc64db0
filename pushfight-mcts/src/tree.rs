//! MCTS DAG structure and node management
//!
//! Uses arena allocation with a transposition index, so a position reached by
//! different move orders is a single node with several parents. Visit/reward
//! statistics live on edges, keyed by (parent, child).
//!
//! ## Architecture
//! - Level 2: DAG operations (expand, select_child, backpropagate)
//! - Level 3: UCT calculation, node accessors
//! - Level 4: Statistics, utilities

use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use rustc_hash::FxHashMap;

use pushfight_core::{next_moves, Board, Player, TurnMove};

// ============================================================================
// TYPES
// ============================================================================

/// Node identifier (index into arena)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(pub usize);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);
}

/// Statistics for one parent -> child edge
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EdgeStats {
    /// Simulations that went through this edge
    pub plays: u32,
    /// Sum of rewards (+1 White win, -1 Black win)
    pub reward: f32,
}

impl EdgeStats {
    /// Mean reward, 0 for an unplayed edge
    pub fn average(&self) -> f32 {
        if self.plays == 0 {
            0.0
        } else {
            self.reward / self.plays as f32
        }
    }

    pub fn record(&mut self, reward: f32) {
        self.plays += 1;
        self.reward += reward;
    }
}

/// A position in the search DAG
#[derive(Clone, Debug)]
pub struct MctsNode {
    pub board: Board,
    /// Side to move from this position
    pub turn: Player,
    /// Simulations that passed through this node
    pub visits: u32,
    /// Expanded children: (move, node_id) pairs
    pub children: Vec<(TurnMove, NodeId)>,
    /// Legal moves not yet expanded, in random order
    pub unexplored: Vec<(TurnMove, Board)>,
    /// Whether `unexplored` has been filled in
    pub generated: bool,
    /// Winner, once the position is known to be decided
    pub winner: Option<Player>,
}

impl MctsNode {
    pub fn new(board: Board, turn: Player) -> Self {
        Self {
            board,
            turn,
            visits: 0,
            children: Vec::new(),
            unexplored: Vec::new(),
            generated: false,
            winner: board.check_winner(),
        }
    }

    /// Is this a terminal node?
    pub fn is_terminal(&self) -> bool {
        self.winner.is_some()
    }

    /// Is this node fully expanded?
    pub fn is_fully_expanded(&self) -> bool {
        self.generated && self.unexplored.is_empty()
    }

    /// Reward for a terminal node
    pub fn terminal_reward(&self) -> Option<f32> {
        self.winner.map(Player::sign)
    }
}

// ============================================================================
// MCTS TREE (Level 2 - DAG Operations)
// ============================================================================

/// MCTS search DAG with arena allocation
#[derive(Debug)]
pub struct MctsTree {
    nodes: Vec<MctsNode>,
    index: FxHashMap<(Board, Player), NodeId>,
    edges: FxHashMap<(NodeId, NodeId), EdgeStats>,
}

impl MctsTree {
    /// Create a new tree with the given root position
    pub fn new(board: Board, turn: Player) -> Self {
        let mut index = FxHashMap::default();
        index.insert((board, turn), NodeId::ROOT);
        Self {
            nodes: vec![MctsNode::new(board, turn)],
            index,
            edges: FxHashMap::default(),
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    pub fn get(&self, id: NodeId) -> &MctsNode {
        &self.nodes[id.0]
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut MctsNode {
        &mut self.nodes[id.0]
    }

    /// Get the number of nodes in the tree
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Statistics of an edge; unplayed edges read as default
    pub fn edge(&self, parent: NodeId, child: NodeId) -> EdgeStats {
        self.edges.get(&(parent, child)).copied().unwrap_or_default()
    }

    /// Look up or create the node for a position
    pub fn intern(&mut self, board: Board, turn: Player) -> NodeId {
        if let Some(&id) = self.index.get(&(board, turn)) {
            return id;
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(MctsNode::new(board, turn));
        self.index.insert((board, turn), id);
        id
    }

    // ========================================================================
    // Level 2: Expansion
    // ========================================================================

    /// Generate the node's legal moves on first use.
    ///
    /// A side with no legal move has lost, so such a node becomes terminal.
    pub fn generate_moves(&mut self, id: NodeId, rng: &mut ChaCha8Rng) {
        let node = self.get_mut(id);
        if node.generated || node.is_terminal() {
            return;
        }
        let mut moves = next_moves(&node.board, node.turn);
        if moves.is_empty() {
            node.winner = Some(node.turn.opponent());
        }
        moves.shuffle(rng);
        node.unexplored = moves;
        node.generated = true;
    }

    /// Expand a node by adding one child
    ///
    /// Returns the move and the child's NodeId, or None if nothing is left to
    /// expand. The child may be a node that already exists elsewhere in the DAG.
    pub fn expand(&mut self, id: NodeId) -> Option<(TurnMove, NodeId)> {
        let (mv, board) = self.get_mut(id).unexplored.pop()?;
        let turn = self.get(id).turn.opponent();
        let child = self.intern(board, turn);
        self.get_mut(id).children.push((mv, child));
        Some((mv, child))
    }

    // ========================================================================
    // Level 3: Selection Helpers
    // ========================================================================

    /// Child with the highest UCT score for the side to move, with its score
    pub fn select_child(&self, id: NodeId, exploration: f32) -> Option<(TurnMove, NodeId, f32)> {
        let node = self.get(id);
        node.children
            .iter()
            .map(|&(mv, child)| (mv, child, self.uct(id, child, exploration)))
            .max_by(|a, b| a.2.partial_cmp(&b.2).unwrap_or(std::cmp::Ordering::Equal))
    }

    /// UCT score, oriented so that higher is better for the side to move
    ///
    /// White maximises `avg + c * sqrt(2 ln N / n)`, Black minimises
    /// `avg - c * sqrt(2 ln N / n)`; both are the same as maximising
    /// `sign * avg + c * sqrt(2 ln N / n)`.
    pub fn uct(&self, parent: NodeId, child: NodeId, exploration: f32) -> f32 {
        let edge = self.edge(parent, child);
        if edge.plays == 0 {
            return f32::INFINITY;
        }
        let parent_visits = self.get(parent).visits.max(1) as f32;
        let sign = self.get(parent).turn.sign();
        let explore = exploration * (2.0 * parent_visits.ln() / edge.plays as f32).sqrt();
        sign * edge.average() + explore
    }

    // ========================================================================
    // Level 2: Backpropagation
    // ========================================================================

    /// Credit `reward` to every node on `path` and every edge between them
    pub fn backpropagate(&mut self, path: &[NodeId], reward: f32) {
        for (i, &id) in path.iter().enumerate() {
            // A repeated node at the end of a cyclic path is only counted once
            if !path[..i].contains(&id) {
                self.get_mut(id).visits += 1;
            }
        }
        for pair in path.windows(2) {
            self.edges.entry((pair[0], pair[1])).or_default().record(reward);
        }
    }

    // ========================================================================
    // Level 3: Best Move Selection
    // ========================================================================

    /// Root edge with the best average reward for the side to move
    pub fn best_move(&self) -> Option<(TurnMove, NodeId)> {
        let root = self.root();
        let sign = self.get(root).turn.sign();
        self.get(root)
            .children
            .iter()
            .filter(|(_, child)| self.edge(root, *child).plays > 0)
            .max_by(|(_, a), (_, b)| {
                let va = sign * self.edge(root, *a).average();
                let vb = sign * self.edge(root, *b).average();
                va.partial_cmp(&vb).unwrap_or(std::cmp::Ordering::Equal)
            })
            .copied()
    }

    /// All expanded root moves with their edge statistics (for analysis)
    pub fn move_statistics(&self) -> Vec<(TurnMove, NodeId, EdgeStats)> {
        let root = self.root();
        self.get(root)
            .children
            .iter()
            .map(|&(mv, child)| (mv, child, self.edge(root, child)))
            .collect()
    }

    /// Get total simulations run (root visits)
    pub fn total_simulations(&self) -> u32 {
        self.get(self.root()).visits
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pushfight_core::Cell;
    use rand::SeedableRng;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(42)
    }

    #[test]
    fn test_tree_creation() {
        let tree = MctsTree::new(Board::default_setup(), Player::White);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.root(), NodeId::ROOT);
        assert!(!tree.get(NodeId::ROOT).generated);
        assert!(!tree.get(NodeId::ROOT).is_terminal());
    }

    #[test]
    fn test_edge_stats_average() {
        let mut stats = EdgeStats::default();
        assert_eq!(stats.average(), 0.0);

        stats.record(1.0);
        stats.record(1.0);
        stats.record(-1.0);
        stats.record(0.0);
        assert_eq!(stats.plays, 4);
        assert!((stats.average() - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_tree_expansion() {
        let mut tree = MctsTree::new(Board::default_setup(), Player::White);
        tree.generate_moves(NodeId::ROOT, &mut rng());
        let total = tree.get(NodeId::ROOT).unexplored.len();
        assert!(total > 0);

        let (_, child) = tree.expand(NodeId::ROOT).unwrap();
        assert_eq!(tree.len(), 2);
        assert_eq!(tree.get(child).turn, Player::Black);
        assert_eq!(tree.get(NodeId::ROOT).children.len(), 1);
        assert_eq!(tree.get(NodeId::ROOT).unexplored.len(), total - 1);
        assert!(!tree.get(NodeId::ROOT).is_fully_expanded());
    }

    #[test]
    fn test_transpositions_share_a_node() {
        let board = Board::default_setup();
        let mut tree = MctsTree::new(board, Player::White);
        let a = tree.intern(board, Player::Black);
        let b = tree.intern(board, Player::Black);
        assert_eq!(a, b);
        assert_ne!(a, NodeId::ROOT);
        assert_eq!(tree.intern(board, Player::White), NodeId::ROOT);
    }

    #[test]
    fn test_unplayed_edge_is_urgent() {
        let mut tree = MctsTree::new(Board::default_setup(), Player::White);
        tree.generate_moves(NodeId::ROOT, &mut rng());
        let (_, child) = tree.expand(NodeId::ROOT).unwrap();
        assert!(tree.uct(NodeId::ROOT, child, 1.0).is_infinite());
    }

    #[test]
    fn test_backpropagation() {
        let mut tree = MctsTree::new(Board::default_setup(), Player::White);
        tree.generate_moves(NodeId::ROOT, &mut rng());
        let (_, child) = tree.expand(NodeId::ROOT).unwrap();

        tree.backpropagate(&[NodeId::ROOT, child], 1.0);
        tree.backpropagate(&[NodeId::ROOT, child], -1.0);
        tree.backpropagate(&[NodeId::ROOT, child], 1.0);

        assert_eq!(tree.total_simulations(), 3);
        assert_eq!(tree.get(child).visits, 3);
        let edge = tree.edge(NodeId::ROOT, child);
        assert_eq!(edge.plays, 3);
        assert!((edge.average() - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_cyclic_path_counts_node_once() {
        let mut tree = MctsTree::new(Board::default_setup(), Player::White);
        tree.generate_moves(NodeId::ROOT, &mut rng());
        let (_, child) = tree.expand(NodeId::ROOT).unwrap();

        tree.backpropagate(&[NodeId::ROOT, child, NodeId::ROOT], 0.0);
        assert_eq!(tree.get(NodeId::ROOT).visits, 1);
        assert_eq!(tree.edge(child, NodeId::ROOT).plays, 1);
    }

    #[test]
    fn test_best_move_respects_side_to_move() {
        for (turn, expected_reward) in [(Player::White, 1.0), (Player::Black, -1.0)] {
            let mut tree = MctsTree::new(Board::default_setup(), turn);
            tree.generate_moves(NodeId::ROOT, &mut rng());
            let (_, good) = tree.expand(NodeId::ROOT).unwrap();
            let (_, bad) = tree.expand(NodeId::ROOT).unwrap();
            let (_, unplayed) = tree.expand(NodeId::ROOT).unwrap();

            tree.backpropagate(&[NodeId::ROOT, good], expected_reward);
            tree.backpropagate(&[NodeId::ROOT, bad], -expected_reward);

            let (_, best) = tree.best_move().unwrap();
            assert_eq!(best, good);
            assert_ne!(best, unplayed);
        }
    }

    #[test]
    fn test_terminal_node() {
        // Black already lost a piece
        let cells = |list: &[&str]| -> Vec<Cell> { list.iter().map(|s| s.parse().unwrap()).collect() };
        let board = Board::from_cells(
            &cells(&["a3", "a4", "a5", "d2"]),
            &cells(&["c6"]),
            &cells(&["c7", "d4", "d5"]),
            &cells(&["c8"]),
        );
        let mut tree = MctsTree::new(board, Player::Black);
        assert!(tree.get(NodeId::ROOT).is_terminal());
        assert_eq!(tree.get(NodeId::ROOT).terminal_reward(), Some(1.0));

        tree.generate_moves(NodeId::ROOT, &mut rng());
        assert!(tree.get(NodeId::ROOT).unexplored.is_empty());
    }
}
