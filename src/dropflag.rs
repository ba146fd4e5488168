//! This module is for testing only

use std::cell::RefCell;
use std::rc::Rc;

pub type DropFlag<T> = Rc<RefCell<T>>;

/// Counts live instances in its flag: +1 on creation or clone, -1 on drop.
#[derive(Debug)]
pub struct Tracked {
    pub value: i32,
    pub dropflag: DropFlag<i32>,
}

impl Tracked {
    pub fn new(value: i32, dropflag: &DropFlag<i32>) -> Tracked {
        *dropflag.borrow_mut() += 1;
        Tracked {
            value,
            dropflag: dropflag.clone(),
        }
    }
}

impl Clone for Tracked {
    fn clone(&self) -> Self {
        Tracked::new(self.value, &self.dropflag)
    }
}

impl PartialEq for Tracked {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        *self.dropflag.borrow_mut() -= 1;
    }
}

#[test]
fn dropflag() {
    let flag = DropFlag::new(RefCell::new(0));
    let a = Tracked::new(1, &flag);
    let b = a.clone();
    assert_eq!(2, *flag.borrow());
    std::mem::drop(a);
    assert_eq!(1, *flag.borrow());
    std::mem::drop(b);
    assert_eq!(0, *flag.borrow());
}
