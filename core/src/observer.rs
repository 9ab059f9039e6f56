//! Mutation-driven discovery of post roots.
//!
//! Every batch of structural changes is mapped back to the post roots it
//! touches and each root is handed to the [`PostProcessor`]. Processing is
//! idempotent, so a root touched by several records in one batch is simply
//! processed several times.

use std::rc::Rc;

use tracing::{debug, info};

use crate::dom::{Document, Mutation, MutationFeed};
use crate::overlay::OverlaySurface;
use crate::processor::PostProcessor;
use crate::resolver::ThreadSource;
use crate::runtime::Runtime;

pub struct DomObserver<D, S, R>
where
    D: OverlaySurface + MutationFeed,
    S: ThreadSource,
    R: Runtime,
{
    dom: Rc<D>,
    runtime: Rc<R>,
    processor: PostProcessor<D, S, R>,
}

impl<D, S, R> DomObserver<D, S, R>
where
    D: OverlaySurface + MutationFeed,
    S: ThreadSource,
    R: Runtime,
{
    pub fn new(dom: Rc<D>, runtime: Rc<R>, processor: PostProcessor<D, S, R>) -> Rc<Self> {
        Rc::new(Self {
            dom,
            runtime,
            processor,
        })
    }

    pub fn processor(&self) -> &PostProcessor<D, S, R> {
        &self.processor
    }

    /// Subscribe to page mutations for the page's lifetime and schedule the
    /// catch-up scan after load.
    ///
    /// Besides child insertions the subscription covers the attributes the
    /// platform reads text from, so a label set on an existing node is seen.
    pub fn start(self: &Rc<Self>, settle_delay_ms: u32) {
        let platform = &self.processor.platform().name;
        info!(platform = %platform, "Observing page for media");

        let attributes = self.processor.platform().watched_attributes();
        let weak = Rc::downgrade(self);
        self.dom.observe(
            &attributes,
            Box::new(move |batch| {
                if let Some(this) = weak.upgrade() {
                    this.handle_batch(&batch);
                }
            }),
        );

        let weak = Rc::downgrade(self);
        let runtime = Rc::clone(&self.runtime);
        self.dom.on_load(Box::new(move || {
            runtime.schedule(
                settle_delay_ms,
                Box::new(move || {
                    if let Some(this) = weak.upgrade() {
                        this.scan_all();
                    }
                }),
            );
        }));
    }

    /// Process every root touched by a batch of changes.
    pub fn handle_batch(&self, batch: &[Mutation<D::Node>]) {
        let root_selector = &self.processor.platform().root;

        for mutation in batch {
            for node in mutation.added.iter().filter(|n| self.dom.is_element(n)) {
                if self.dom.matches(node, root_selector) {
                    self.processor.process(node);
                } else {
                    for root in self.dom.query_all(node, root_selector) {
                        self.processor.process(&root);
                    }
                }
            }

            // late-arriving media inside an existing post
            if self.dom.is_element(&mutation.target)
                && let Some(root) = self.dom.closest(&mutation.target, root_selector)
            {
                self.processor.process(&root);
            }
        }

        self.processor.prune_detached();
    }

    /// Process every root currently on the page.
    pub fn scan_all(&self) {
        let roots = self
            .dom
            .query_all(&self.dom.body(), &self.processor.platform().root);
        debug!(count = roots.len(), "Full scan of post roots");
        for root in &roots {
            self.processor.process(root);
        }
    }
}
