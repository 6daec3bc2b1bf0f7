use crate::arena::ScratchArena;
use crate::config::TmConfig;
use crate::dset::BranchSet;

/// Worker-local state for processing one request.
///
/// Owned by a single worker and reset at the start of every transaction, so
/// nothing in here is ever shared.
#[derive(Debug)]
pub struct RequestContext {
    pub branches: BranchSet,
    pub scratch: ScratchArena,
}

impl RequestContext {
    pub fn new(config: &TmConfig) -> Self {
        RequestContext {
            branches: BranchSet::new(config.max_branches, config.max_uri_size, config.max_dset_len),
            scratch: ScratchArena::new(config.scratch_limit),
        }
    }

    /// Forget everything from the previous request
    pub fn reset(&mut self) {
        self.branches.clear();
        self.scratch.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dset::RequestTarget;

    #[test]
    fn test_reset_clears_branches_and_scratch() {
        let mut ctx = RequestContext::new(&TmConfig::default());
        ctx.branches.append_branch(Some(b"sip:a@x.com"), &RequestTarget::new(b"sip:t")).unwrap();
        assert!(ctx.branches.create_dset(None, &mut ctx.scratch).is_some());
        assert!(ctx.scratch.used() > 0);

        ctx.reset();
        assert!(ctx.branches.is_empty());
        assert_eq!(ctx.scratch.used(), 0);
    }
}
