//! `List.*` and `Map.*` natives.
//!
//! Mutating natives change the collection in place, so every alias of it
//! observes the change.

use crate::vm::value::Value;

use super::{checked_index, int_arg, list_arg, map_arg, slice_bounds, Arity, NativeRegistry};

pub fn register(registry: &mut NativeRegistry) {
    register_list(registry);
    register_map(registry);
}

fn register_list(registry: &mut NativeRegistry) {
    registry.register("List.length", Arity::Exact(1), |_, args| {
        Ok(Value::Int(list_arg(args, 0)?.borrow().len() as i64))
    });

    // Returns the list itself.
    registry.register("List.append", Arity::Exact(2), |_, args| {
        list_arg(args, 0)?.borrow_mut().push(args[1].clone());
        Ok(args[0].clone())
    });

    // `null` on an empty list.
    registry.register("List.pop", Arity::Exact(1), |_, args| {
        Ok(list_arg(args, 0)?.borrow_mut().pop().unwrap_or(Value::Null))
    });

    registry.register("List.get", Arity::Exact(2), |_, args| {
        let items = list_arg(args, 0)?;
        let items = items.borrow();
        let index = checked_index(int_arg(args, 1)?, items.len(), false)?;
        Ok(items[index].clone())
    });

    registry.register("List.set", Arity::Exact(3), |_, args| {
        let items = list_arg(args, 0)?;
        let mut items = items.borrow_mut();
        let index = checked_index(int_arg(args, 1)?, items.len(), false)?;
        items[index] = args[2].clone();
        Ok(Value::Null)
    });

    registry.register("List.slice", Arity::Range(2, 3), |_, args| {
        let items = list_arg(args, 0)?;
        let items = items.borrow();
        let end = match args.get(2) {
            Some(_) => Some(int_arg(args, 2)?),
            None => None,
        };
        let (start, end) = slice_bounds(int_arg(args, 1)?, end, items.len());
        Ok(Value::list(items[start..end].to_vec()))
    });

    registry.register("List.contains", Arity::Exact(2), |_, args| {
        Ok(Value::Bool(list_arg(args, 0)?.borrow().contains(&args[1])))
    });

    registry.register("List.index_of", Arity::Exact(2), |_, args| {
        let position = list_arg(args, 0)?
            .borrow()
            .iter()
            .position(|item| *item == args[1]);
        Ok(Value::Int(position.map(|i| i as i64).unwrap_or(-1)))
    });

    registry.register("List.join", Arity::Range(1, 2), |_, args| {
        let separator = match args.get(1) {
            Some(Value::String(s)) => s.clone(),
            Some(other) => return Err(format!("expects String separator, got {}", other.type_name())),
            None => String::new(),
        };
        let parts: Vec<String> = list_arg(args, 0)?
            .borrow()
            .iter()
            .map(Value::to_string)
            .collect();
        Ok(Value::String(parts.join(&separator)))
    });

    // In place; returns the list.
    registry.register("List.reverse", Arity::Exact(1), |_, args| {
        list_arg(args, 0)?.borrow_mut().reverse();
        Ok(args[0].clone())
    });

    registry.register("List.insert", Arity::Exact(3), |_, args| {
        let items = list_arg(args, 0)?;
        let mut items = items.borrow_mut();
        let index = checked_index(int_arg(args, 1)?, items.len(), true)?;
        items.insert(index, args[2].clone());
        Ok(Value::Null)
    });

    // Returns the removed element.
    registry.register("List.remove", Arity::Exact(2), |_, args| {
        let items = list_arg(args, 0)?;
        let mut items = items.borrow_mut();
        let index = checked_index(int_arg(args, 1)?, items.len(), false)?;
        Ok(items.remove(index))
    });
}

fn register_map(registry: &mut NativeRegistry) {
    registry.register("Map.length", Arity::Exact(1), |_, args| {
        Ok(Value::Int(map_arg(args, 0)?.borrow().len() as i64))
    });

    registry.register("Map.keys", Arity::Exact(1), |_, args| {
        let keys = map_arg(args, 0)?
            .borrow()
            .keys()
            .map(|k| Value::String(k.clone()))
            .collect();
        Ok(Value::list(keys))
    });

    registry.register("Map.values", Arity::Exact(1), |_, args| {
        let values = map_arg(args, 0)?.borrow().values().cloned().collect();
        Ok(Value::list(values))
    });

    registry.register("Map.has", Arity::Exact(2), |_, args| {
        Ok(Value::Bool(
            map_arg(args, 0)?.borrow().contains_key(&args[1].to_key()),
        ))
    });

    // Optional third argument is the default for a missing key.
    registry.register("Map.get", Arity::Range(2, 3), |_, args| {
        let value = map_arg(args, 0)?.borrow().get(&args[1].to_key()).cloned();
        Ok(value.unwrap_or_else(|| args.get(2).cloned().unwrap_or(Value::Null)))
    });

    registry.register("Map.set", Arity::Exact(3), |_, args| {
        map_arg(args, 0)?
            .borrow_mut()
            .insert(args[1].to_key(), args[2].clone());
        Ok(Value::Null)
    });

    // Keeps the order of the remaining entries; returns the removed value.
    registry.register("Map.remove", Arity::Exact(2), |_, args| {
        let removed = map_arg(args, 0)?.borrow_mut().shift_remove(&args[1].to_key());
        Ok(removed.unwrap_or(Value::Null))
    });
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;
    use pretty_assertions::assert_eq;

    use super::super::testing::call;
    use crate::vm::value::Value;

    fn ints(values: &[i64]) -> Value {
        Value::list(values.iter().copied().map(Value::Int).collect())
    }

    #[test]
    fn append_is_visible_through_aliases() {
        let list = ints(&[1, 2, 3]);
        let alias = list.clone();
        call("List.append", vec![list, Value::Int(4)]).unwrap();
        assert_eq!(alias, ints(&[1, 2, 3, 4]));
    }

    #[test]
    fn indexing_is_bounds_checked() {
        assert_eq!(
            call("List.get", vec![ints(&[5, 6]), Value::Int(1)]).unwrap(),
            Value::Int(6)
        );
        assert!(call("List.get", vec![ints(&[5, 6]), Value::Int(2)]).is_err());
        assert!(call("List.get", vec![ints(&[5, 6]), Value::Int(-1)]).is_err());
    }

    #[test]
    fn insert_remove_and_pop() {
        let list = ints(&[1, 3]);
        call("List.insert", vec![list.clone(), Value::Int(1), Value::Int(2)]).unwrap();
        call("List.insert", vec![list.clone(), Value::Int(3), Value::Int(4)]).unwrap();
        assert_eq!(list, ints(&[1, 2, 3, 4]));
        assert_eq!(
            call("List.remove", vec![list.clone(), Value::Int(0)]).unwrap(),
            Value::Int(1)
        );
        assert_eq!(call("List.pop", vec![list.clone()]).unwrap(), Value::Int(4));
        assert_eq!(list, ints(&[2, 3]));
        assert_eq!(call("List.pop", vec![ints(&[])]).unwrap(), Value::Null);
    }

    #[test]
    fn searching_and_joining() {
        let list = ints(&[1, 2, 3]);
        assert_eq!(
            call("List.index_of", vec![list.clone(), Value::Float(2.0)]).unwrap(),
            Value::Int(1)
        );
        assert_eq!(
            call("List.join", vec![list.clone(), Value::String("-".into())]).unwrap(),
            Value::String("1-2-3".into())
        );
        assert_eq!(
            call("List.slice", vec![list.clone(), Value::Int(1)]).unwrap(),
            ints(&[2, 3])
        );
        call("List.reverse", vec![list.clone()]).unwrap();
        assert_eq!(list, ints(&[3, 2, 1]));
    }

    #[test]
    fn maps() {
        let map = Value::map(IndexMap::new());
        let key = Value::String("a".into());
        call("Map.set", vec![map.clone(), key.clone(), Value::Int(1)]).unwrap();
        call("Map.set", vec![map.clone(), Value::String("b".into()), Value::Int(2)]).unwrap();

        assert_eq!(call("Map.length", vec![map.clone()]).unwrap(), Value::Int(2));
        assert_eq!(
            call("Map.has", vec![map.clone(), key.clone()]).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            call("Map.keys", vec![map.clone()]).unwrap(),
            Value::list(vec!["a".into(), "b".into()])
        );
        assert_eq!(
            call("Map.get", vec![map.clone(), "zz".into(), Value::Int(9)]).unwrap(),
            Value::Int(9)
        );
        assert_eq!(
            call("Map.remove", vec![map.clone(), key]).unwrap(),
            Value::Int(1)
        );
        assert_eq!(call("Map.values", vec![map]).unwrap(), ints(&[2]));
    }
}
