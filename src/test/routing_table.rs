use crate::net::{NodeId, RoutingTable};

fn build_rev_adj(adj: &[Vec<NodeId>]) -> Vec<Vec<NodeId>> {
    let mut rev = vec![Vec::new(); adj.len()];
    for (from, nbrs) in adj.iter().enumerate() {
        for &to in nbrs {
            rev[to.0].push(NodeId(from));
        }
    }
    rev
}

#[test]
fn routing_table_builds_next_hops_for_shortest_paths() {
    // Diamond:
    // 0 -> 1 -> 3
    //  \-> 2 ->/
    let adj = vec![
        vec![NodeId(2), NodeId(1)],
        vec![NodeId(3)],
        vec![NodeId(3)],
        vec![],
    ];
    let rev_adj = build_rev_adj(&adj);

    let mut rt = RoutingTable::default();
    rt.ensure_built(&adj, &rev_adj);

    // Equal-cost candidates resolve to the lowest node id.
    assert_eq!(rt.next_hop(NodeId(0), NodeId(3)), Some(NodeId(1)));
    assert_eq!(rt.next_hop(NodeId(0), NodeId(1)), Some(NodeId(1)));
    assert_eq!(rt.next_hop(NodeId(0), NodeId(2)), Some(NodeId(2)));
    assert_eq!(rt.next_hop(NodeId(1), NodeId(3)), Some(NodeId(3)));
    assert_eq!(rt.next_hop(NodeId(2), NodeId(3)), Some(NodeId(3)));

    assert!(rt.next_hop(NodeId(3), NodeId(0)).is_none());
    assert!(rt.next_hop(NodeId(0), NodeId(0)).is_none());
}

#[test]
fn routing_table_requires_mark_dirty_to_rebuild() {
    let mut adj = vec![
        vec![NodeId(1), NodeId(2)],
        vec![NodeId(3)],
        vec![NodeId(3)],
        vec![],
    ];
    let mut rev_adj = build_rev_adj(&adj);

    let mut rt = RoutingTable::default();
    assert!(rt.is_dirty());
    rt.ensure_built(&adj, &rev_adj);
    assert!(!rt.is_dirty());
    assert_eq!(rt.next_hop(NodeId(0), NodeId(3)), Some(NodeId(1)));

    // Mutate topology (remove 0->1 edge) but do not mark dirty.
    adj[0] = vec![NodeId(2)];
    rev_adj = build_rev_adj(&adj);
    rt.ensure_built(&adj, &rev_adj);
    assert_eq!(rt.next_hop(NodeId(0), NodeId(3)), Some(NodeId(1)));

    rt.mark_dirty();
    assert!(rt.is_dirty());
    rt.ensure_built(&adj, &rev_adj);
    assert!(!rt.is_dirty());
    assert_eq!(rt.next_hop(NodeId(0), NodeId(3)), Some(NodeId(2)));
    assert!(rt.next_hop(NodeId(0), NodeId(1)).is_none());
}

#[test]
fn routing_table_prefers_fewer_hops() {
    // 0 -> 1 -> 2 -> 3 and a shortcut 0 -> 3
    let adj = vec![
        vec![NodeId(1), NodeId(3)],
        vec![NodeId(2)],
        vec![NodeId(3)],
        vec![],
    ];
    let rev_adj = build_rev_adj(&adj);
    let mut rt = RoutingTable::default();
    rt.ensure_built(&adj, &rev_adj);
    assert_eq!(rt.next_hop(NodeId(0), NodeId(3)), Some(NodeId(3)));
    assert_eq!(rt.next_hop(NodeId(0), NodeId(2)), Some(NodeId(1)));
}
