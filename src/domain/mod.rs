// ============================================================================
// Domain Layer - Business Logic
// ============================================================================
//
// Orders own the dispatch rules; sellers are a read-only projection the
// geo index hands back. This layer does no I/O.
//
// ============================================================================

pub mod order;
pub mod seller;
