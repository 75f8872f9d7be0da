// Memoized value producers for dependent schedules
// A primary action and its children must observe the same produced value

use std::cell::RefCell;
use std::rc::Rc;

/// Anything that yields a value when invoked
///
/// This is the single capability shared by plain closures, [`MemoCell`] and
/// the player generators: producers may be stateful and non-idempotent
/// (random choice, advancing cycles), so invoking one is an effect.
pub trait Generate<T> {
    fn next_value(&mut self) -> T;
}

impl<T, F: FnMut() -> T> Generate<T> for F {
    fn next_value(&mut self) -> T {
        self()
    }
}

/// Caches the most recent result of a producer
///
/// `invoke()` runs the producer and stores the result; `last_value()` reads
/// the stored result without re-invoking. Dependent (child) schedules hold a
/// [`MemoReader`] so a note-off can target the exact note the primary action
/// chose, instead of re-sampling a randomized producer.
pub struct MemoCell<T> {
    source: Box<dyn FnMut() -> T>,
    last: Rc<RefCell<Option<T>>>,
}

impl<T: Clone + 'static> MemoCell<T> {
    /// Wraps a producer
    pub fn new(mut source: impl Generate<T> + 'static) -> Self {
        Self {
            source: Box::new(move || source.next_value()),
            last: Rc::new(RefCell::new(None)),
        }
    }

    /// Invokes the producer, stores the result, and returns it
    pub fn invoke(&mut self) -> T {
        let value = (self.source)();
        *self.last.borrow_mut() = Some(value.clone());
        value
    }

    /// Returns the most recently stored value without invoking the producer
    ///
    /// `None` until the first `invoke()`.
    pub fn last_value(&self) -> Option<T> {
        self.last.borrow().clone()
    }

    /// A read-only view of the stored value for dependent actions
    pub fn reader(&self) -> MemoReader<T> {
        MemoReader {
            last: Rc::clone(&self.last),
        }
    }
}

impl<T: Clone + 'static> Generate<T> for MemoCell<T> {
    fn next_value(&mut self) -> T {
        self.invoke()
    }
}

/// Cloneable read-only view of a [`MemoCell`]'s stored value
#[derive(Clone)]
pub struct MemoReader<T> {
    last: Rc<RefCell<Option<T>>>,
}

impl<T: Clone> MemoReader<T> {
    /// The value stored by the cell's most recent `invoke()`
    pub fn get(&self) -> Option<T> {
        self.last.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invoke_stores_value() {
        let mut count = 0;
        let mut memo = MemoCell::new(move || {
            count += 1;
            count
        });

        assert_eq!(memo.last_value(), None);
        assert_eq!(memo.invoke(), 1);
        assert_eq!(memo.last_value(), Some(1));
        assert_eq!(memo.invoke(), 2);
        assert_eq!(memo.last_value(), Some(2));
    }

    #[test]
    fn test_last_value_is_stable_between_invokes() {
        let mut next = 10;
        let mut memo = MemoCell::new(move || {
            next += 10;
            next
        });
        memo.invoke();

        // reading never advances the producer
        assert_eq!(memo.last_value(), Some(20));
        assert_eq!(memo.last_value(), Some(20));
        assert_eq!(memo.last_value(), Some(20));
    }

    #[test]
    fn test_reader_sees_fresh_values() {
        let mut n = 0u8;
        let mut memo = MemoCell::new(move || {
            n += 1;
            n
        });
        let reader = memo.reader();

        assert_eq!(reader.get(), None);
        memo.invoke();
        assert_eq!(reader.get(), Some(1));
        memo.invoke();
        assert_eq!(reader.get(), Some(2));
    }
}
