//! Stock element sink, diagnostic log and cancellation flag.

use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::{DiagnosticSink, ElementSink, LoadSignal};
use crate::diagnostics::{Diagnostic, Severity};
use crate::element::{ElementState, PanelElement};

/// Per-car element lists of the current car section.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CarSections {
    /// Elements per car index
    pub cars: Vec<Vec<PanelElement>>,
}

impl CarSections {
    /// Sections for `cars` cars, all empty.
    pub fn new(cars: usize) -> Self {
        Self {
            cars: vec![Vec::new(); cars],
        }
    }

    /// Elements of one car, in render order.
    pub fn elements(&self, car: usize) -> &[PanelElement] {
        self.cars.get(car).map(Vec::as_slice).unwrap_or(&[])
    }

    fn car_mut(&mut self, car: usize) -> &mut Vec<PanelElement> {
        if car >= self.cars.len() {
            self.cars.resize_with(car + 1, Vec::new);
        }
        &mut self.cars[car]
    }
}

impl ElementSink for CarSections {
    fn append_element(&mut self, car: usize, element: PanelElement) -> usize {
        let list = self.car_mut(car);
        list.push(element);
        list.len() - 1
    }

    fn append_state(&mut self, car: usize, element: usize, state: ElementState) {
        match self.car_mut(car).get_mut(element) {
            Some(target) => target.states.push(state),
            None => tracing::error!("car {} has no element {} to extend", car, element),
        }
    }

    fn last_element(&self, car: usize) -> Option<usize> {
        self.cars.get(car)?.len().checked_sub(1)
    }
}

/// Collects diagnostics and mirrors them to `tracing`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DiagnosticLog {
    /// In reporting order
    pub entries: Vec<Diagnostic>,
}

impl DiagnosticLog {
    /// Diagnostics of [`Severity::Error`].
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(|d| d.severity == Severity::Error)
    }

    /// True when nothing was reported.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl DiagnosticSink for DiagnosticLog {
    fn report(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Error if diagnostic.critical => tracing::error!("{}", diagnostic),
            Severity::Error | Severity::Warning => tracing::warn!("{}", diagnostic),
            Severity::Information => tracing::info!("{}", diagnostic),
        }
        self.entries.push(diagnostic);
    }
}

/// Shareable cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Ask the running compile to stop after the current section.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

impl LoadSignal for CancelFlag {
    fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn yield_now(&mut self) {
        std::thread::yield_now();
    }
}
